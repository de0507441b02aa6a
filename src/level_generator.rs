//! Skiplists use a probabilistic distribution of nodes over the internal
//! levels, whereby the lowest level (level 0) contains all the nodes, and each
//! level $n > 0$ will contain a random subset of the nodes on level `n - 1`.
//!
//! Most commonly, a geometric distribution is used whereby the chance that a
//! node occupies level $n$ is $p$ times the chance of occupying level $n-1$
//! (with $0 < p < 1$).
//!
//! The generator only ever affects performance.  A map stays correct for any
//! sequence of levels, including one which puts every node on level 0, which
//! is what makes [`Cycle`] useful for exercising specific shapes.

pub mod cycle;
pub mod geometric;

pub use cycle::Cycle;
pub use geometric::Geometric;

/// The hard ceiling on the number of levels a map will ever allocate.
///
/// Generators may report a larger [`total`][LevelGenerator::total]; the map
/// clamps it to this value.
pub const MAX_HEIGHT: usize = 32;

// ////////////////////////////////////////////////////////////////////////////
// Level Generator
// ////////////////////////////////////////////////////////////////////////////

/// Upon the insertion of a new node in the list, the node is replicated to high
/// levels with a certain probability as determined by a [`LevelGenerator`].
pub trait LevelGenerator {
    /// The total number of levels that are assumed to exist.
    #[must_use]
    fn total(&self) -> usize;

    /// Generate a random level for a new node in the range `[0, total)`.
    ///
    /// This function should _never_ return a level greater or equal to
    /// [`total`][LevelGenerator::total].
    #[must_use]
    fn level(&mut self) -> usize;
}

impl<G: LevelGenerator + ?Sized> LevelGenerator for &mut G {
    #[inline]
    fn total(&self) -> usize {
        (**self).total()
    }

    #[inline]
    fn level(&mut self) -> usize {
        (**self).level()
    }
}

/// The number of levels a map built on `generator` uses: the generator's
/// total, capped at [`MAX_HEIGHT`] and never zero.
#[inline]
pub(crate) fn ceiling<G: LevelGenerator + ?Sized>(generator: &G) -> usize {
    generator.total().clamp(1, MAX_HEIGHT)
}

/// Draw a node height (the number of lanes it occupies) in `[1, ceiling]`.
#[inline]
pub(crate) fn height<G: LevelGenerator + ?Sized>(generator: &mut G) -> usize {
    let ceiling = ceiling(generator);
    generator.level().saturating_add(1).min(ceiling)
}
