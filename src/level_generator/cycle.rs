//! Deterministic level generator replaying a fixed sequence.

use thiserror::Error;

use crate::level_generator::LevelGenerator;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur when creating a [`Cycle`] level generator.
#[expect(
    clippy::module_name_repetitions,
    reason = "Using 'Error' would be too generic and may cause confusion."
)]
#[non_exhaustive]
pub enum CycleError {
    /// The maximum number of levels must be non-zero.
    #[error("max must be non-zero.")]
    ZeroMax,
    /// At least one level must be given.
    #[error("levels must not be empty.")]
    Empty,
}

/// A level generator which hands out the given levels in order, starting
/// over once it runs out.
///
/// Levels at or above `total` are clamped to `total - 1`.  This makes it
/// possible to force specific shapes onto a map: `[0]` degrades it to a
/// plain sorted linked list, `[total - 1]` puts every node on every level.
///
/// ```
/// use skipmap::{SkipMap, level_generator::Cycle};
///
/// let mut map = SkipMap::with_level_generator(Cycle::new(4, [0, 3, 1])?);
/// map.extend((0..10).map(|x| (x, x * x)));
/// assert_eq!(map.get(&3), Some(&9));
/// # Ok::<(), skipmap::level_generator::cycle::CycleError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Cycle {
    total: usize,
    levels: Vec<usize>,
    next: usize,
}

impl Cycle {
    /// Create a new generator over `total` levels replaying `levels`.
    ///
    /// # Errors
    ///
    /// `total` must be at least 1 and `levels` must not be empty.
    #[inline]
    pub fn new(total: usize, levels: impl IntoIterator<Item = usize>) -> Result<Self, CycleError> {
        if total == 0 {
            return Err(CycleError::ZeroMax);
        }
        let levels: Vec<_> = levels.into_iter().map(|l| l.min(total - 1)).collect();
        if levels.is_empty() {
            return Err(CycleError::Empty);
        }
        Ok(Cycle {
            total,
            levels,
            next: 0,
        })
    }
}

impl LevelGenerator for Cycle {
    #[inline]
    fn total(&self) -> usize {
        self.total
    }

    #[inline]
    fn level(&mut self) -> usize {
        let level = self.levels.get(self.next).copied().unwrap_or_default();
        self.next = (self.next + 1) % self.levels.len();
        level
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::{Cycle, CycleError, LevelGenerator};

    #[test]
    fn invalid() {
        assert_eq!(Cycle::new(0, [1]).err(), Some(CycleError::ZeroMax));
        assert_eq!(Cycle::new(4, Vec::new()).err(), Some(CycleError::Empty));
    }

    #[test]
    fn replays_and_clamps() -> Result<()> {
        let mut generator = Cycle::new(3, [0, 1, 7])?;
        let levels: Vec<_> = (0..7).map(|_| generator.level()).collect();
        assert_eq!(levels, [0, 1, 2, 0, 1, 2, 0]);
        Ok(())
    }
}
