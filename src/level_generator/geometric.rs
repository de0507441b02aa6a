//! Geometric level generator.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use thiserror::Error;

use crate::level_generator::{LevelGenerator, MAX_HEIGHT};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur when creating a [`Geometric`] level generator.
#[expect(
    clippy::module_name_repetitions,
    reason = "Using 'Error' would be too generic and may cause confusion."
)]
#[non_exhaustive]
pub enum GeometricError {
    /// The maximum number of levels must be non-zero.
    #[error("max must be non-zero.")]
    ZeroMax,
    /// The maximum number of levels must be less than `i32::MAX`.
    #[error("max must be less than i32::MAX.")]
    MaxTooLarge,
    /// The probability `$p$` must be in the range `$(0, 1)$`.
    #[error("p must be in (0, 1).")]
    InvalidProbability,
}

/// A level generator using a geometric distribution.
///
/// With a geometric distribution, the probability that a node is present in
/// level `$n$` is `$p^n$` (with `$0 < p < 1$`).  The probability is truncated
/// at the maximum number of levels allowed.
#[derive(Debug, Clone)]
pub struct Geometric {
    /// The total number of levels that are assumed to exist.
    total: usize,
    /// `$p^{\text{total}}$`, cached as it is needed for every sample.
    p_total: f64,
    /// The probability that a node is present in the next level.
    p: f64,
    /// The random number generator.
    rng: SmallRng,
}

impl Geometric {
    /// Create a new geometric level generator with `total` number of levels,
    /// and `p` as the probability that a given node is present in the next
    /// level.
    ///
    /// The generator is seeded from the thread-local random number generator.
    ///
    /// # Errors
    ///
    /// `p` must be between 0 and 1, and `total` must be at least 1 and fit in
    /// an `i32`.
    #[inline]
    pub fn new(total: usize, p: f64) -> Result<Self, GeometricError> {
        Self::with_rng(total, p, SmallRng::from_rng(&mut rand::rng()))
    }

    /// Create a new geometric level generator whose sequence of levels is
    /// fully determined by `seed`.
    ///
    /// # Errors
    ///
    /// Same as [`Geometric::new`].
    #[inline]
    pub fn with_seed(total: usize, p: f64, seed: u64) -> Result<Self, GeometricError> {
        Self::with_rng(total, p, SmallRng::seed_from_u64(seed))
    }

    /// Create a generator over `total` levels where each level holds about
    /// half of the nodes of the one below.  `total` is clamped to `[1,
    /// MAX_HEIGHT]`, so this cannot fail.
    ///
    /// ```
    /// use skipmap::level_generator::{Geometric, LevelGenerator};
    ///
    /// assert_eq!(Geometric::halving(0).total(), 1);
    /// assert_eq!(Geometric::halving(1000).total(), 32);
    /// ```
    #[inline]
    #[must_use]
    pub fn halving(total: usize) -> Self {
        let total = total.clamp(1, MAX_HEIGHT);
        let exponent = i32::try_from(total).unwrap_or(i32::MAX);
        Geometric {
            total,
            p_total: 0.5_f64.powi(exponent),
            p: 0.5,
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }

    fn with_rng(total: usize, p: f64, rng: SmallRng) -> Result<Self, GeometricError> {
        if total == 0 {
            return Err(GeometricError::ZeroMax);
        }
        let Ok(exponent) = i32::try_from(total) else {
            return Err(GeometricError::MaxTooLarge);
        };
        if !(0.0 < p && p < 1.0) {
            return Err(GeometricError::InvalidProbability);
        }
        Ok(Geometric {
            total,
            p_total: p.powi(exponent),
            p,
            rng,
        })
    }
}

impl Default for Geometric {
    /// [`MAX_HEIGHT`] levels, each holding about half of the nodes of the one
    /// below.
    #[inline]
    fn default() -> Self {
        Self::halving(MAX_HEIGHT)
    }
}

impl LevelGenerator for Geometric {
    #[inline]
    fn total(&self) -> usize {
        self.total
    }

    /// Generate a level for a new node using a geometric distribution.
    ///
    /// A uniform variate `$u \in [0, 1)$` is mapped through the inverse of the
    /// truncated distribution's CDF:
    ///
    /// ```math
    /// n = \left\lfloor \log_p\left(1 + (p^{\text{total}} - 1) \cdot u\right) \right\rfloor
    /// ```
    ///
    /// so that `$P(n \geq k) \approx p^k$` for `$k < \text{total}$`.
    #[inline]
    #[expect(clippy::float_arithmetic, reason = "Computing inverse CDF")]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "The logarithm lies in [0, total) so the cast is safe"
    )]
    #[expect(clippy::as_conversions, reason = "No other way to do this")]
    fn level(&mut self) -> usize {
        let u = self.rng.random::<f64>();
        let level = (1.0 + (self.p_total - 1.0) * u).log(self.p).floor() as usize;
        // Rounding can land exactly on `total` when `u` is close to 1.
        level.min(self.total - 1)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{Geometric, GeometricError, LevelGenerator};

    #[test]
    fn invalid_max() {
        assert_eq!(Geometric::new(0, 0.5).err(), Some(GeometricError::ZeroMax));
    }

    #[test]
    fn invalid_p() {
        assert_eq!(
            Geometric::new(1, 0.0).err(),
            Some(GeometricError::InvalidProbability)
        );
        assert_eq!(
            Geometric::new(1, 1.0).err(),
            Some(GeometricError::InvalidProbability)
        );
        assert_eq!(
            Geometric::new(1, f64::NAN).err(),
            Some(GeometricError::InvalidProbability)
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(GeometricError::ZeroMax.to_string(), "max must be non-zero.");
        assert_eq!(
            GeometricError::InvalidProbability.to_string(),
            "p must be in (0, 1)."
        );
    }

    #[rstest]
    fn levels_in_range(
        #[values(1, 2, 16, 32)] n: usize,
        #[values(0.1, 0.5, 0.9)] p: f64,
    ) -> Result<()> {
        let mut generator = Geometric::new(n, p)?;
        assert_eq!(generator.total(), n);
        for _ in 0..10_000 {
            let level = generator.level();
            assert!((0..n).contains(&level));
        }
        Ok(())
    }

    #[test]
    fn roughly_halves_per_level() -> Result<()> {
        let mut generator = Geometric::with_seed(32, 0.5, 0x1234_abcd)?;
        let mut counts = [0_usize; 32];
        for _ in 0..100_000 {
            counts[generator.level()] += 1;
        }
        // Level 0 should take about half of all samples and level 1 about a
        // quarter; the bounds are loose enough to never flake.
        assert!((45_000..55_000).contains(&counts[0]), "{counts:?}");
        assert!((20_000..30_000).contains(&counts[1]), "{counts:?}");
        Ok(())
    }

    #[test]
    fn halving_clamps() {
        assert_eq!(Geometric::halving(0).total(), 1);
        assert_eq!(Geometric::halving(10).total(), 10);
        assert_eq!(Geometric::default().total(), 32);
        let mut generator = Geometric::halving(3);
        assert!((0..1000).all(|_| generator.level() < 3));
    }

    #[test]
    fn seeded_is_reproducible() -> Result<()> {
        let mut a = Geometric::with_seed(16, 0.5, 7)?;
        let mut b = Geometric::with_seed(16, 0.5, 7)?;
        let a: Vec<_> = (0..256).map(|_| a.level()).collect();
        let b: Vec<_> = (0..256).map(|_| b.level()).collect();
        assert_eq!(a, b);
        Ok(())
    }
}
