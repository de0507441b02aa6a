//! An ordered map built on a skiplist.  Entries can be efficiently accessed,
//! inserted and removed, all in `O(log(n))` on average.
//!
//! Conceptually, the map resembles something like:
//!
//! ```text
//! <head> ----------> [2] --------------------------------------------------> [9] ---------> <tail>
//! <head> ----------> [2] ------------------------------------[7] ----------> [9] ---------> <tail>
//! <head> ----------> [2] ----------> [4] ------------------> [7] ----------> [9] --> [10] -> <tail>
//! <head> --> [1] --> [2] --> [3] --> [4] --> [5] --> [6] --> [7] --> [8] --> [9] --> [10] -> <tail>
//! ```
//!
//! where each node `[x]` has references to nodes further down the list,
//! allowing a search to skip ahead.  The bottom lane also links every node to
//! its predecessor, so the map can be walked in either direction; the tail
//! doubles as the past-the-end position.
//!
//! Keys are unique.  Inserting a key which is already present leaves the
//! existing entry alone.
//!
//! A map may be given its own ordering function instead of `K`'s [`Ord`]
//! implementation.  The function **must** be well-behaved.  Specifically,
//! given some ordering function `f(a, b)`, it must satisfy the following
//! properties:
//!
//! - Be well defined: `f(a, b)` should always return the same value
//! - Be anti-symmetric: `f(a, b) == Greater` iff `f(b, a) == Less` and `f(a,
//!   b) == Equal == f(b, a)`.
//! - By transitive: If `f(a, b) == Greater` and `f(b, c) == Greater` then
//!   `f(a, c) == Greater`.
//!
//! **Failure to satisfy these properties results in entries which cannot be
//! found, or iteration out of order.**
//!
//! ```
//! use skipmap::SkipMap;
//!
//! let mut map = SkipMap::new();
//! map.insert(3, "c");
//! map.insert(1, "a");
//! map.insert(2, "b");
//!
//! assert_eq!(map.iter().collect::<Vec<_>>(), [(&1, &"a"), (&2, &"b"), (&3, &"c")]);
//! assert_eq!(map.erase(&2), Ok("b"));
//! assert_eq!(map.keys().rev().collect::<Vec<_>>(), [&3, &1]);
//! ```

pub mod error;
pub mod level_generator;
mod skipmap;
mod skipnode;

pub use error::{Error, Precondition, Result};
pub use skipmap::{
    Cursor, CursorMut, Direction, Forward, IntoIter, Iter, IterMut, Keys, Position, Reverse,
    SkipMap, Values, ValuesMut,
};
