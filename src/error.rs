//! Errors returned by [`SkipMap`][crate::SkipMap] operations.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors that can occur when operating on a [`SkipMap`][crate::SkipMap].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The requested key is not present in the map.
    #[error("key not found.")]
    KeyNotFound,
    /// Storage for a new node could not be reserved.
    #[error("failed to allocate a node.")]
    AllocationFailure,
    /// A [`Position`][crate::Position] was used in a way that its contract
    /// forbids.
    #[error("precondition violated: {0}")]
    PreconditionViolation(#[from] Precondition),
}

/// The ways in which a [`Position`][crate::Position] can be misused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Precondition {
    /// The past-the-end position was dereferenced.
    #[error("position is past the end.")]
    PastTheEnd,
    /// The before-the-beginning position was dereferenced or erased.
    #[error("position is before the beginning.")]
    BeforeBegin,
    /// The position was produced by a different map.
    #[error("position belongs to another map.")]
    ForeignPosition,
    /// The entry the position referred to has since been erased.
    #[error("position refers to an erased entry.")]
    StalePosition,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Error, Precondition};

    #[test]
    fn display() {
        assert_eq!(Error::KeyNotFound.to_string(), "key not found.");
        assert_eq!(
            Error::from(Precondition::StalePosition).to_string(),
            "precondition violated: position refers to an erased entry."
        );
    }
}
