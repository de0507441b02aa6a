//! SkipMap stores key-value pairs, with the keys being unique and always
//! sorted.

mod cursor;
mod iter;

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops,
    sync::{
        Arc,
        atomic::{self, AtomicU64},
    },
};

use tracing::{debug, trace};

pub use self::{
    cursor::{Cursor, CursorMut, Direction, Forward, Position, Reverse},
    iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut},
};
use crate::{
    error::{Error, Precondition, Result},
    level_generator::{self, Geometric, LevelGenerator, MAX_HEIGHT},
    skipnode::{NodeId, NodeStore, levels_required},
};

type Comparator<K> = Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

/// Source of the identifiers which tie a [`Position`] to the map that
/// produced it.
static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(0);

fn next_map_id() -> u64 {
    NEXT_MAP_ID.fetch_add(1, atomic::Ordering::Relaxed)
}

/// The outcome of descending through the lanes towards a key.
struct Located {
    /// For every lane, the last node visited on that lane before dropping
    /// down.  Lanes above the map's current height are left at the head.
    path: [NodeId; MAX_HEIGHT],
    /// The node holding the key, if there is one.
    found: Option<NodeId>,
}

// ////////////////////////////////////////////////////////////////////////////
// SkipMap
// ////////////////////////////////////////////////////////////////////////////

/// The skipmap provides a way of storing element pairs such that they keys are
/// always sorted whilst at the same time providing efficient way to access,
/// insert and removes nodes.
///
/// Inserting an existing key leaves the stored value untouched; use
/// [`get_mut`][SkipMap::get_mut] or [`at_mut`][SkipMap::at_mut] to modify it.
///
/// Besides the usual iterators, entries can be referred to through
/// [`Position`]s, which stay valid until the entry they refer to is erased
/// regardless of what else is inserted or removed, and walked in either
/// direction with [`Cursor`]s.
///
/// Note that mutable references to keys are not available at all as this could
/// result in a node being left out of the proper ordering.
pub struct SkipMap<K, V, G = Geometric> {
    nodes: NodeStore<K, V>,
    len: usize,
    // Number of lanes currently in use; no node is taller than this.
    height: usize,
    level_generator: G,
    compare: Comparator<K>,
    id: u64,
}

// ///////////////////////////////////////////////
// Inherent methods
// ///////////////////////////////////////////////

impl<K, V> SkipMap<K, V>
where
    K: Ord,
{
    /// Create a new skipmap with the default number of 32 levels.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap: SkipMap<i64, String> = SkipMap::new();
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_level_generator(Geometric::default())
    }

    /// Constructs a new, empty skipmap with the optimal number of levels for
    /// the intended capacity.  Specifically, it uses `floor(log2(capacity)) +
    /// 1` levels, ensuring that only *a few* nodes occupy the highest level.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::with_capacity(100);
    /// skipmap.extend((0..100).map(|x| (x, x)));
    /// ```
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_level_generator(Geometric::halving(levels_required(capacity)))
    }
}

impl<K, V> SkipMap<K, V> {
    /// Create a new skipmap ordered by `compare` instead of by `K`'s [`Ord`]
    /// implementation.
    ///
    /// The comparison must be a total order; see the crate documentation.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::with_comparator(|a: &i32, b: &i32| b.cmp(a));
    /// skipmap.extend([(1, "a"), (3, "c"), (2, "b")]);
    /// assert_eq!(skipmap.keys().copied().collect::<Vec<_>>(), [3, 2, 1]);
    /// ```
    #[inline]
    pub fn with_comparator<F>(compare: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        Self::with_comparator_and_level_generator(compare, Geometric::default())
    }
}

impl<K, V, G> SkipMap<K, V, G>
where
    K: Ord,
    G: LevelGenerator,
{
    /// Create a new skipmap drawing node heights from `level_generator`.
    ///
    /// The generator's [`total`][LevelGenerator::total] fixes the number of
    /// levels the map will use, up to [`MAX_HEIGHT`].
    #[inline]
    pub fn with_level_generator(level_generator: G) -> Self {
        Self::with_comparator_and_level_generator(|a: &K, b: &K| a.cmp(b), level_generator)
    }
}

impl<K, V, G> SkipMap<K, V, G>
where
    G: LevelGenerator,
{
    /// Create a new skipmap with both a custom ordering and a custom level
    /// generator.
    #[inline]
    pub fn with_comparator_and_level_generator<F>(compare: F, level_generator: G) -> Self
    where
        F: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        SkipMap {
            nodes: NodeStore::new(level_generator::ceiling(&level_generator)),
            len: 0,
            height: 1,
            level_generator,
            compare: Arc::new(compare),
            id: next_map_id(),
        }
    }

    /// Insert the element into the skipmap.
    ///
    /// Returns the position of the entry with this key, and whether it was
    /// newly inserted.  If the key was already present the map is left
    /// unchanged, and `value` is dropped.
    ///
    /// # Panics
    ///
    /// Panics if storage for the new node cannot be allocated; see
    /// [`try_insert`][SkipMap::try_insert].
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    ///
    /// let (first, inserted) = skipmap.insert(1, "Hello");
    /// assert!(inserted);
    /// let (again, inserted) = skipmap.insert(1, "World");
    /// assert!(!inserted);
    /// assert_eq!(first, again);
    /// assert_eq!(skipmap.get(&1), Some(&"Hello"));
    /// ```
    #[inline]
    #[expect(clippy::panic, reason = "Allocation failure is fatal here")]
    pub fn insert(&mut self, key: K, value: V) -> (Position, bool) {
        match self.try_insert(key, value) {
            Ok(result) => result,
            Err(err) => panic!("{err}"),
        }
    }

    /// Insert the element into the skipmap, reporting allocation failure
    /// instead of panicking.
    ///
    /// # Errors
    ///
    /// [`Error::AllocationFailure`] if the node cannot be allocated, in which
    /// case the map is unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(Position, bool)> {
        let located = self.locate(&key);
        if let Some(existing) = located.found {
            return Ok((self.position(existing), false));
        }
        let id = self.link_new(&located, key, value)?;
        Ok((self.position(id), true))
    }

    /// Returns a mutable reference to the value for `key`, inserting the value
    /// produced by `default` first if the key is absent.
    ///
    /// # Panics
    ///
    /// Panics if storage for a new node cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// *skipmap.get_or_insert_with("a", || 10) += 1;
    /// *skipmap.get_or_insert_with("a", || 10) += 1;
    /// assert_eq!(skipmap.get(&"a"), Some(&12));
    /// ```
    #[expect(clippy::panic, reason = "Allocation failure is fatal here")]
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let located = self.locate(&key);
        let id = match located.found {
            Some(id) => id,
            None => match self.link_new(&located, key, default()) {
                Ok(id) => id,
                Err(err) => panic!("{err}"),
            },
        };
        match self.nodes.entry_mut(id) {
            Some((_, value)) => value,
            None => unreachable!("located node holds no entry"),
        }
    }

    /// Returns a mutable reference to the value for `key`, inserting
    /// `V::default()` first if the key is absent.
    ///
    /// # Panics
    ///
    /// Panics if storage for a new node cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut counts = SkipMap::new();
    /// for word in "the cat and the hat".split(' ') {
    ///     *counts.get_or_insert_default(word) += 1;
    /// }
    /// assert_eq!(counts.get(&"the"), Some(&2));
    /// assert_eq!(counts.len(), 4);
    /// ```
    #[inline]
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Draw a height for a new node and splice it into every lane it
    /// reaches, using the path recorded while locating its key.
    fn link_new(&mut self, located: &Located, key: K, value: V) -> Result<NodeId> {
        let height =
            level_generator::height(&mut self.level_generator).min(self.nodes.ceiling());
        let id = self.nodes.create((key, value), height)?;
        if height > self.height {
            // The path above the old height was left at the head, whose lanes
            // up there run straight to the tail.
            trace!(from = self.height, to = height, "raising lane height");
            self.height = height;
        }

        for (lane, &pred) in located.path.iter().enumerate().take(height) {
            let succ = self.nodes.link(pred, lane);
            self.nodes.set_link(id, lane, succ);
            self.nodes.set_link(pred, lane, id);
        }
        let pred = located.path[0];
        let succ = self.nodes.link(id, 0);
        self.nodes.set_prev(id, pred);
        // When the new node is the last one, this updates the tail.
        self.nodes.set_prev(succ, id);

        self.len += 1;
        Ok(id)
    }
}

impl<K, V, G> SkipMap<K, V, G> {
    /// Clears the skipmap, removing all values.
    ///
    /// Every [`Position`] handed out before, [`end`][SkipMap::end] included,
    /// is rejected afterwards as belonging to another map.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// skipmap.extend((0..10).map(|x| (x, x)));
    /// skipmap.clear();
    /// assert!(skipmap.is_empty());
    /// ```
    #[inline]
    pub fn clear(&mut self) {
        let dropped = self.nodes.clear();
        debug!(dropped, "cleared skipmap");
        self.len = 0;
        self.height = 1;
        // The store forgot its generations, so retire every position handed
        // out so far.
        self.id = next_map_id();
    }

    /// Returns the number of elements in the skipmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// skipmap.extend((0..10).map(|x| (x, x)));
    /// assert_eq!(skipmap.len(), 10);
    /// ```
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the skipmap contains no elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// assert!(skipmap.is_empty());
    ///
    /// skipmap.insert(1, "Rust");
    /// assert!(!skipmap.is_empty());
    /// ```
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Provides a reference to the first entry, or `None` if the skipmap is
    /// empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// assert!(skipmap.first().is_none());
    ///
    /// skipmap.insert(2, "World");
    /// skipmap.insert(1, "Hello");
    /// assert_eq!(skipmap.first(), Some((&1, &"Hello")));
    /// ```
    #[inline]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.nodes.entry(self.nodes.link(NodeId::HEAD, 0))
    }

    /// Provides a mutable reference to the value of the first entry.
    #[inline]
    pub fn first_mut(&mut self) -> Option<(&K, &mut V)> {
        let first = self.nodes.link(NodeId::HEAD, 0);
        self.nodes.entry_mut(first)
    }

    /// Provides a reference to the last entry, or `None` if the skipmap is
    /// empty.  This does not walk the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// assert!(skipmap.last().is_none());
    ///
    /// skipmap.insert(1, "Hello");
    /// skipmap.insert(2, "World");
    /// assert_eq!(skipmap.last(), Some((&2, &"World")));
    /// ```
    #[inline]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.nodes.entry(self.nodes.prev(NodeId::TAIL))
    }

    /// Provides a mutable reference to the value of the last entry.
    #[inline]
    pub fn last_mut(&mut self) -> Option<(&K, &mut V)> {
        let last = self.nodes.prev(NodeId::TAIL);
        self.nodes.entry_mut(last)
    }

    /// Returns a reference to the value for `key`, or `None` if there is no
    /// such entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// assert!(skipmap.get(&0).is_none());
    /// skipmap.extend((0..10).map(|x| (x, x)));
    /// assert_eq!(skipmap.get(&0), Some(&0));
    /// assert!(skipmap.get(&10).is_none());
    /// ```
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key and the value for `key`.
    #[inline]
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.locate(key)
            .found
            .and_then(|id| self.nodes.entry(id))
    }

    /// Returns a mutable reference to the value for `key`, or `None` if there
    /// is no such entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// skipmap.extend((0..10).map(|x| (x, x)));
    ///
    /// if let Some(x) = skipmap.get_mut(&0) {
    ///     *x = 100;
    /// }
    /// assert_eq!(skipmap.get(&0), Some(&100));
    /// assert!(skipmap.get_mut(&10).is_none());
    /// ```
    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.locate(key).found?;
        self.nodes.entry_mut(id).map(|(_, value)| value)
    }

    /// Returns a reference to the value for `key`.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] if there is no such entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::{Error, SkipMap};
    ///
    /// let skipmap: SkipMap<_, _> = (-5..10).map(|x| (x, x * x * x)).collect();
    /// assert_eq!(skipmap.at(&-2), Ok(&-8));
    /// assert_eq!(skipmap.at(&30), Err(Error::KeyNotFound));
    /// ```
    #[inline]
    pub fn at(&self, key: &K) -> Result<&V> {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Returns a mutable reference to the value for `key`.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] if there is no such entry.
    #[inline]
    pub fn at_mut(&mut self, key: &K) -> Result<&mut V> {
        self.get_mut(key).ok_or(Error::KeyNotFound)
    }

    /// Returns true if the key is contained in the skipmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// skipmap.extend((0..10).map(|x| (x, x)));
    /// assert!(skipmap.contains_key(&4));
    /// assert!(!skipmap.contains_key(&15));
    /// ```
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.locate(key).found.is_some()
    }

    /// Returns the position of the entry for `key`, or [`end`][SkipMap::end]
    /// if there is none.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let skipmap = SkipMap::from([(3, "c"), (1, "a")]);
    /// assert_eq!(skipmap.get_at(skipmap.find(&3)), Ok((&3, &"c")));
    /// assert_eq!(skipmap.find(&2), skipmap.end());
    /// ```
    #[inline]
    pub fn find(&self, key: &K) -> Position {
        let id = self.locate(key).found.unwrap_or(NodeId::TAIL);
        self.position(id)
    }

    /// The position of the first entry, or [`end`][SkipMap::end] if the map
    /// is empty.
    #[inline]
    pub fn begin(&self) -> Position {
        self.position(self.nodes.link(NodeId::HEAD, 0))
    }

    /// The past-the-end position.  It never refers to an entry and is never
    /// invalidated.
    #[inline]
    pub fn end(&self) -> Position {
        self.position(NodeId::TAIL)
    }

    /// Returns the entry at `position`.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionViolation`] if `position` is past the end,
    /// before the beginning, was produced by another map, or refers to an
    /// entry which has been erased.
    #[inline]
    pub fn get_at(&self, position: Position) -> Result<(&K, &V)> {
        let id = self.resolve_entry(position)?;
        self.nodes
            .entry(id)
            .ok_or(Error::from(Precondition::StalePosition))
    }

    /// Returns the entry at `position`, with a mutable reference to the value.
    ///
    /// # Errors
    ///
    /// Same as [`get_at`][SkipMap::get_at].
    #[inline]
    pub fn get_at_mut(&mut self, position: Position) -> Result<(&K, &mut V)> {
        let id = self.resolve_entry(position)?;
        self.nodes
            .entry_mut(id)
            .ok_or(Error::from(Precondition::StalePosition))
    }

    /// Removes the entry for `key`, returning its value.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] if there is no such entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::{Error, SkipMap};
    ///
    /// let mut skipmap = SkipMap::new();
    /// skipmap.extend((0..10).map(|x| (x, x)));
    /// assert_eq!(skipmap.erase(&4), Ok(4));
    /// assert_eq!(skipmap.erase(&4), Err(Error::KeyNotFound));
    /// ```
    pub fn erase(&mut self, key: &K) -> Result<V> {
        let located = self.locate(key);
        let target = located.found.ok_or(Error::KeyNotFound)?;
        self.unlink(&located.path, target)
            .map(|(_, value)| value)
            .ok_or(Error::KeyNotFound)
    }

    /// Removes and returns the value for `key`, or `None` if there is no such
    /// entry.
    #[inline]
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.erase(key).ok()
    }

    /// Removes the entry at `position`, returning it.  Erasing the
    /// past-the-end position does nothing and returns `Ok(None)`.
    ///
    /// Positions of all other entries remain valid.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionViolation`] if `position` is before the
    /// beginning, was produced by another map, or refers to an entry which
    /// has already been erased.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::from([(1, "a"), (2, "b"), (3, "c")]);
    /// let three = skipmap.find(&3);
    /// while !skipmap.is_empty() && skipmap.begin() != three {
    ///     skipmap.erase_at(skipmap.begin())?;
    /// }
    /// assert_eq!(skipmap.get_at(three)?, (&3, &"c"));
    /// assert_eq!(skipmap.erase_at(skipmap.end())?, None);
    /// # Ok::<(), skipmap::Error>(())
    /// ```
    pub fn erase_at(&mut self, position: Position) -> Result<Option<(K, V)>> {
        let id = self.resolve(position)?;
        if id == NodeId::TAIL {
            return Ok(None);
        }
        if id == NodeId::HEAD {
            return Err(Precondition::BeforeBegin.into());
        }
        Ok(self.remove_node(id))
    }

    /// Removes the first entry and returns it, or `None` if the map is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// skipmap.insert(1, "Hello");
    /// skipmap.insert(2, "World");
    ///
    /// assert_eq!(skipmap.pop_first(), Some((1, "Hello")));
    /// assert_eq!(skipmap.pop_first(), Some((2, "World")));
    /// assert!(skipmap.pop_first().is_none());
    /// ```
    #[inline]
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.remove_node(self.nodes.link(NodeId::HEAD, 0))
    }

    /// Removes the last entry and returns it, or `None` if the map is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// skipmap.insert(1, "Hello");
    /// skipmap.insert(2, "World");
    ///
    /// assert_eq!(skipmap.pop_last(), Some((2, "World")));
    /// assert_eq!(skipmap.pop_last(), Some((1, "Hello")));
    /// assert!(skipmap.pop_last().is_none());
    /// ```
    #[inline]
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.remove_node(self.nodes.prev(NodeId::TAIL))
    }

    /// Creates an iterator over the entries of the skipmap, in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// skipmap.extend((0..10).map(|x| (x, x)));
    /// for (k, v) in skipmap.iter() {
    ///     println!("Key: {}, Value: {}", k, v);
    /// }
    /// ```
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.nodes, self.len)
    }

    /// Creates an mutable iterator over the entries of the skipmap.
    ///
    /// The keys cannot be modified as they must remain in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap = SkipMap::new();
    /// skipmap.extend((0..10).map(|x| (x, x)));
    /// for (_, v) in skipmap.iter_mut() {
    ///     *v *= 2;
    /// }
    /// assert_eq!(skipmap.get(&4), Some(&8));
    /// ```
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let len = self.len;
        IterMut::new(&mut self.nodes, len)
    }

    /// Creates an iterator over the keys of the skipmap.
    #[inline]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// Creates an iterator over the values of the skipmap.
    #[inline]
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    /// Creates an iterator over mutable references to the values of the
    /// skipmap.
    #[inline]
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut(self.iter_mut())
    }

    /// A cursor at the first entry, moving towards the last.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let skipmap = SkipMap::from([(1, "a"), (2, "b")]);
    /// let mut cursor = skipmap.cursor_front();
    /// assert_eq!(cursor.key(), Some(&1));
    /// cursor.move_next();
    /// cursor.move_next();
    /// assert!(cursor.is_end());
    /// cursor.move_prev();
    /// assert_eq!(cursor.key(), Some(&2));
    /// ```
    #[inline]
    pub fn cursor_front(&self) -> Cursor<'_, K, V, Forward> {
        Cursor::new(&self.nodes, self.id, self.nodes.link(NodeId::HEAD, 0))
    }

    /// A forward cursor at the past-the-end position.
    #[inline]
    pub fn cursor_end(&self) -> Cursor<'_, K, V, Forward> {
        Cursor::new(&self.nodes, self.id, NodeId::TAIL)
    }

    /// A cursor at the last entry, moving towards the first.
    ///
    /// # Examples
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let skipmap = SkipMap::from([(3, "c"), (1, "a"), (2, "b")]);
    /// let mut cursor = skipmap.cursor_back();
    /// let mut seen = Vec::new();
    /// while let Some((k, _)) = cursor.entry() {
    ///     seen.push(*k);
    ///     cursor.move_next();
    /// }
    /// assert_eq!(seen, [3, 2, 1]);
    /// assert!(cursor.is_end());
    /// ```
    #[inline]
    pub fn cursor_back(&self) -> Cursor<'_, K, V, Reverse> {
        Cursor::new(&self.nodes, self.id, self.nodes.prev(NodeId::TAIL))
    }

    /// A reverse cursor at the before-the-beginning position, which is where
    /// reverse traversal ends.
    #[inline]
    pub fn cursor_rend(&self) -> Cursor<'_, K, V, Reverse> {
        Cursor::new(&self.nodes, self.id, NodeId::HEAD)
    }

    /// A forward cursor at `position`.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionViolation`] if `position` was produced by another
    /// map or refers to an erased entry.
    #[inline]
    pub fn cursor_at(&self, position: Position) -> Result<Cursor<'_, K, V, Forward>> {
        let id = self.resolve(position)?;
        Ok(Cursor::new(&self.nodes, self.id, id))
    }

    /// A mutable cursor at the first entry, moving towards the last.
    #[inline]
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, K, V, G, Forward> {
        let first = self.nodes.link(NodeId::HEAD, 0);
        CursorMut::new(self, first)
    }

    /// A mutable cursor at the last entry, moving towards the first.
    #[inline]
    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, K, V, G, Reverse> {
        let last = self.nodes.prev(NodeId::TAIL);
        CursorMut::new(self, last)
    }

    /// A mutable forward cursor at `position`.
    ///
    /// # Errors
    ///
    /// Same as [`cursor_at`][SkipMap::cursor_at].
    #[inline]
    pub fn cursor_mut_at(&mut self, position: Position) -> Result<CursorMut<'_, K, V, G, Forward>> {
        let id = self.resolve(position)?;
        Ok(CursorMut::new(self, id))
    }
}

impl<K, V, G> SkipMap<K, V, G>
where
    K: Clone,
    V: Clone,
    G: Clone,
{
    /// Create an independent copy of the map, reporting allocation failure
    /// instead of panicking.
    ///
    /// The copy shares no nodes with `self`; positions obtained from one are
    /// foreign to the other.  Nodes keep the heights they had in `self`.
    ///
    /// # Errors
    ///
    /// [`Error::AllocationFailure`] if any node cannot be allocated.
    pub fn try_clone(&self) -> Result<Self> {
        let mut nodes = NodeStore::new(self.nodes.ceiling());
        // The most recent node on each lane, which the next node of at least
        // that height gets linked from.
        let mut last = [NodeId::HEAD; MAX_HEIGHT];
        let mut current = self.nodes.link(NodeId::HEAD, 0);
        while let Some((key, value)) = self.nodes.entry(current) {
            let height = self.nodes.height(current);
            let id = nodes.create((key.clone(), value.clone()), height)?;
            nodes.set_prev(id, last[0]);
            for (lane, pred) in last.iter_mut().enumerate().take(height) {
                nodes.set_link(*pred, lane, id);
                *pred = id;
            }
            current = self.nodes.link(current, 0);
        }
        nodes.set_prev(NodeId::TAIL, last[0]);
        trace!(len = self.len, "copied skipmap");

        Ok(SkipMap {
            nodes,
            len: self.len,
            height: self.height,
            level_generator: self.level_generator.clone(),
            compare: Arc::clone(&self.compare),
            id: next_map_id(),
        })
    }
}

// ///////////////////////////////////////////////
// Internal methods
// ///////////////////////////////////////////////

impl<K, V, G> SkipMap<K, V, G> {
    /// Descend from the head towards `key`, recording the last node visited
    /// on each lane.
    ///
    /// On each lane the search moves right for as long as the next key is
    /// strictly less than `key`, then drops a lane.  Once on lane 0, the node
    /// after the last one visited is either the entry for `key` or the first
    /// entry greater than it (possibly the tail).
    fn locate(&self, key: &K) -> Located {
        let mut path = [NodeId::HEAD; MAX_HEIGHT];
        let mut node = NodeId::HEAD;
        for lane in (0..self.height).rev() {
            loop {
                let next = self.nodes.link(node, lane);
                match self.nodes.key(next) {
                    Some(next_key) if (self.compare)(next_key, key) == Ordering::Less => {
                        node = next;
                    }
                    _ => break,
                }
            }
            path[lane] = node;
        }
        let candidate = self.nodes.link(node, 0);
        let found = self
            .nodes
            .key(candidate)
            .is_some_and(|candidate_key| (self.compare)(candidate_key, key) == Ordering::Equal)
            .then_some(candidate);
        Located { path, found }
    }

    /// Splice `target` out of every lane it is on and free it.
    ///
    /// `path` must be the path recorded while locating `target`'s key.
    fn unlink(&mut self, path: &[NodeId; MAX_HEIGHT], target: NodeId) -> Option<(K, V)> {
        for (lane, &pred) in path.iter().enumerate().take(self.nodes.height(target)) {
            if self.nodes.link(pred, lane) == target {
                let succ = self.nodes.link(target, lane);
                self.nodes.set_link(pred, lane, succ);
            }
        }
        let succ = self.nodes.link(target, 0);
        self.nodes.set_prev(succ, path[0]);

        let entry = self.nodes.destroy(target)?;
        self.len -= 1;

        let height = self.height;
        while self.height > 1 && self.nodes.link(NodeId::HEAD, self.height - 1) == NodeId::TAIL {
            self.height -= 1;
        }
        if self.height < height {
            trace!(from = height, to = self.height, "lowering lane height");
        }
        Some(entry)
    }

    /// Remove the entry held by `id`, or return `None` if `id` holds no
    /// entry.
    fn remove_node(&mut self, id: NodeId) -> Option<(K, V)> {
        let path = {
            let key = self.nodes.key(id)?;
            self.locate(key).path
        };
        self.unlink(&path, id)
    }

    fn position(&self, id: NodeId) -> Position {
        Position {
            map: self.id,
            node: id,
            generation: self.nodes.generation(id).unwrap_or_default(),
        }
    }

    /// Check that `position` was produced by this map and still refers to a
    /// live node (an entry or a sentinel).
    fn resolve(&self, position: Position) -> Result<NodeId> {
        if position.map != self.id {
            return Err(Precondition::ForeignPosition.into());
        }
        if self.nodes.generation(position.node) != Some(position.generation)
            || !self.nodes.is_live(position.node)
        {
            return Err(Precondition::StalePosition.into());
        }
        Ok(position.node)
    }

    /// Like [`resolve`][Self::resolve], additionally rejecting the sentinels.
    fn resolve_entry(&self, position: Position) -> Result<NodeId> {
        match self.resolve(position)? {
            NodeId::TAIL => Err(Precondition::PastTheEnd.into()),
            NodeId::HEAD => Err(Precondition::BeforeBegin.into()),
            id => Ok(id),
        }
    }
}

#[cfg(test)]
impl<K, V, G> SkipMap<K, V, G> {
    /// Checks the integrity of the skipmap.
    fn check(&self) {
        let ceiling = self.nodes.ceiling();
        assert!((1..=ceiling).contains(&self.height));
        assert_eq!(self.nodes.prev(NodeId::HEAD), NodeId::HEAD);

        // Lane 0 holds every entry, in strictly increasing order, with
        // backward links mirroring the forward ones.
        let mut order = Vec::new();
        let mut prev = NodeId::HEAD;
        let mut node = self.nodes.link(NodeId::HEAD, 0);
        while node != NodeId::TAIL {
            assert!(self.nodes.is_live(node));
            assert_eq!(self.nodes.prev(node), prev);
            assert!((1..=self.height).contains(&self.nodes.height(node)));
            if let (Some(a), Some(b)) = (self.nodes.key(prev), self.nodes.key(node)) {
                assert_eq!((self.compare)(a, b), Ordering::Less);
            }
            order.push(node);
            prev = node;
            node = self.nodes.link(node, 0);
        }
        assert_eq!(self.nodes.prev(NodeId::TAIL), prev);
        assert_eq!(order.len(), self.len);

        // Every other lane is exactly the subsequence of nodes tall enough to
        // reach it.
        for lane in 1..ceiling {
            let expected: Vec<_> = order
                .iter()
                .copied()
                .filter(|&id| self.nodes.height(id) > lane)
                .collect();
            let mut actual = Vec::new();
            let mut node = self.nodes.link(NodeId::HEAD, lane);
            while node != NodeId::TAIL {
                actual.push(node);
                node = self.nodes.link(node, lane);
            }
            assert_eq!(actual, expected, "lane {lane}");
        }
        for lane in 0..ceiling {
            assert_eq!(self.nodes.link(NodeId::TAIL, lane), NodeId::TAIL);
        }
    }

    /// The height of every node, in order.
    fn heights(&self) -> Vec<usize> {
        let mut heights = Vec::new();
        let mut node = self.nodes.link(NodeId::HEAD, 0);
        while node != NodeId::TAIL {
            heights.push(self.nodes.height(node));
            node = self.nodes.link(node, 0);
        }
        heights
    }
}

// ///////////////////////////////////////////////
// Trait implementation
// ///////////////////////////////////////////////

impl<K: Ord, V> Default for SkipMap<K, V> {
    #[inline]
    fn default() -> SkipMap<K, V> {
        SkipMap::new()
    }
}

impl<K, V, G> Clone for SkipMap<K, V, G>
where
    K: Clone,
    V: Clone,
    G: Clone,
{
    /// # Panics
    ///
    /// Panics if storage for the copy cannot be allocated; see
    /// [`try_clone`][SkipMap::try_clone].
    #[inline]
    #[expect(clippy::panic, reason = "Allocation failure is fatal here")]
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(copy) => copy,
            Err(err) => panic!("{err}"),
        }
    }
}

/// This implementation of PartialEq only checks that the *entries* are equal;
/// it does not check for equivalence of other features (such as the ordering
/// function and the node levels). Furthermore, this uses `K`'s implementation
/// of PartialEq and *does not* use the owning skipmap's comparison function.
impl<AK, AV, AG, BK, BV, BG> PartialEq<SkipMap<BK, BV, BG>> for SkipMap<AK, AV, AG>
where
    AK: PartialEq<BK>,
    AV: PartialEq<BV>,
{
    #[inline]
    fn eq(&self, other: &SkipMap<BK, BV, BG>) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(x, y)| x.0 == y.0 && x.1 == y.1)
    }
}

impl<K, V, G> Eq for SkipMap<K, V, G>
where
    K: Eq,
    V: Eq,
{
}

/// Maps compare lexicographically by their entries, in order; a map which is
/// a prefix of another is the lesser.
impl<K, V, G> PartialOrd for SkipMap<K, V, G>
where
    K: PartialOrd,
    V: PartialOrd,
{
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K, V, G> Ord for SkipMap<K, V, G>
where
    K: Ord,
    V: Ord,
{
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K, V, G> Extend<(K, V)> for SkipMap<K, V, G>
where
    G: LevelGenerator,
{
    /// Inserts every entry in turn; entries whose key is already present are
    /// dropped.
    #[inline]
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iterable: I) {
        for (key, value) in iterable {
            self.insert(key, value);
        }
    }
}

impl<K, V, G> ops::Index<&K> for SkipMap<K, V, G> {
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present.
    #[inline]
    #[expect(clippy::expect_used, reason = "Indexing panics on a missing key")]
    fn index(&self, key: &K) -> &V {
        self.get(key).expect("key not found")
    }
}

impl<K, V, G> fmt::Debug for SkipMap<K, V, G>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;

        for (i, (k, v)) in self.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "({k:?}, {v:?})")?;
        }
        write!(f, "]")
    }
}

impl<K, V, G> fmt::Display for SkipMap<K, V, G>
where
    K: fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;

        for (i, (k, v)) in self.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "({k}, {v})")?;
        }
        write!(f, "]")
    }
}

impl<K, V, G> IntoIterator for SkipMap<K, V, G> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.nodes, self.len)
    }
}

impl<'a, K, V, G> IntoIterator for &'a SkipMap<K, V, G> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, G> IntoIterator for &'a mut SkipMap<K, V, G> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V> FromIterator<(K, V)> for SkipMap<K, V>
where
    K: Ord,
{
    #[inline]
    fn from_iter<I>(iter: I) -> SkipMap<K, V>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut skipmap = SkipMap::new();
        skipmap.extend(iter);
        skipmap
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for SkipMap<K, V>
where
    K: Ord,
{
    /// Builds a map from the given entries; later duplicates of a key are
    /// dropped.
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let skipmap = SkipMap::from([(1, 1.0), (3, 5.67), (13, 6.9)]);
    /// assert_eq!(skipmap.len(), 3);
    /// ```
    #[inline]
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Hash, V: Hash, G> Hash for SkipMap<K, V, G> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len);
        for elt in self {
            elt.hash(state);
        }
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Tests
// ////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::{
        cmp::Ordering,
        collections::{BTreeMap, hash_map::DefaultHasher},
        hash::{Hash, Hasher},
        sync::{Arc, Mutex, PoisonError},
        thread,
    };

    use anyhow::Result;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use rstest::rstest;

    use super::{Position, SkipMap};
    use crate::{
        error::{Error, Precondition},
        level_generator::{Cycle, Geometric, MAX_HEIGHT},
    };

    /// Generators forcing particular shapes onto a map.
    fn shape(name: &str) -> Cycle {
        let levels: Vec<usize> = match name {
            "flat" => vec![0],
            "tallest" => vec![MAX_HEIGHT - 1],
            "skewed" => vec![0, 0, 1, 0, 5, 2, 0, 31, 0, 3],
            _ => unreachable!("unknown shape {name}"),
        };
        match Cycle::new(MAX_HEIGHT, levels) {
            Ok(generator) => generator,
            Err(err) => panic!("{err}"),
        }
    }

    fn entries<K: Clone, V: Clone, G>(sm: &SkipMap<K, V, G>) -> Vec<(K, V)> {
        sm.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    #[test]
    fn basic_small() {
        let mut sm: SkipMap<i64, i64> = SkipMap::new();
        sm.check();
        assert!(sm.remove(&1).is_none());
        sm.check();
        assert!(sm.insert(1, 0).1);
        sm.check();
        assert!(!sm.insert(1, 5).1);
        assert_eq!(sm.get(&1), Some(&0));
        sm.check();
        assert_eq!(sm.remove(&1), Some(0));
        sm.check();
        assert!(sm.insert(1, 10).1);
        sm.check();
        assert!(sm.insert(2, 20).1);
        sm.check();
        assert_eq!(sm.remove(&1), Some(10));
        sm.check();
        assert_eq!(sm.remove(&2), Some(20));
        sm.check();
        assert!(sm.remove(&1).is_none());
        sm.check();
    }

    #[test]
    fn basic_large() {
        let size = 10_000;
        let mut sm = SkipMap::with_capacity(size);
        assert!(sm.is_empty());

        for i in 0..size {
            sm.insert(i, i * 10);
            assert_eq!(sm.len(), i + 1);
        }
        sm.check();

        for i in 0..size {
            assert_eq!(sm.remove(&i), Some(i * 10));
            assert_eq!(sm.len(), size - i - 1);
        }
        sm.check();
        assert_eq!(sm.height, 1);
    }

    #[test]
    fn scenario() {
        let mut sm = SkipMap::new();
        sm.insert(3, "c");
        sm.insert(1, "a");
        sm.insert(2, "b");
        sm.check();

        assert_eq!(entries(&sm), [(1, "a"), (2, "b"), (3, "c")]);
        let reversed: Vec<_> = sm.iter().rev().map(|(&k, &v)| (k, v)).collect();
        assert_eq!(reversed, [(3, "c"), (2, "b"), (1, "a")]);
        assert_eq!(sm.at(&2), Ok(&"b"));
        assert_eq!(sm.at(&9), Err(Error::KeyNotFound));

        assert_eq!(sm.erase(&2), Ok("b"));
        sm.check();
        assert_eq!(entries(&sm), [(1, "a"), (3, "c")]);
    }

    #[test]
    fn insert_never_overwrites() {
        let size = 100;
        let mut sm = SkipMap::new();

        for i in 0..size {
            let (position, inserted) = sm.insert(i, format!("{i}"));
            assert!(inserted);
            assert_eq!(sm.find(&i), position);
        }

        for i in (0..size).rev() {
            let (position, inserted) = sm.insert(i, String::from("replaced"));
            assert!(!inserted);
            assert_eq!(sm.get_at(position), Ok((&i, &format!("{i}"))));
        }
        assert_eq!(sm.len(), size);
        sm.check();
    }

    #[test]
    fn erase_twice() {
        let mut sm: SkipMap<_, _> = (0..10).map(|x| (x, x)).collect();
        assert_eq!(sm.erase(&5), Ok(5));
        assert_eq!(sm.erase(&5), Err(Error::KeyNotFound));
        assert_eq!(sm.len(), 9);
        sm.check();
    }

    #[test]
    fn at_mut() -> Result<()> {
        let mut sm = SkipMap::from([(1, 10), (2, 20)]);
        *sm.at_mut(&2)? += 5;
        assert_eq!(sm[&2], 25);
        assert_eq!(sm.at_mut(&3), Err(Error::KeyNotFound));
        Ok(())
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn index_missing() {
        let sm = SkipMap::from([(1, 10)]);
        let _missing = sm[&2];
    }

    #[test]
    fn get_or_insert() {
        let words = [
            "this", "is", "a", "string", "with", "words", "some", "words", "in", "the", "string",
            "repeat", "the", "more", "they", "repeat", "the", "more",
        ];
        let mut counts: SkipMap<&str, usize> = SkipMap::new();
        for word in words {
            *counts.get_or_insert_default(word) += 1;
        }
        counts.check();
        assert_eq!(counts.len(), 12);
        assert_eq!(counts.get(&"the"), Some(&3));
        assert_eq!(counts.first(), Some((&"a", &1)));
        assert_eq!(counts.last(), Some((&"words", &2)));

        assert_eq!(*counts.get_or_insert_with("zebra", || 7), 7);
        assert_eq!(*counts.get_or_insert_with("zebra", || 9), 7);
    }

    #[test]
    fn clear() {
        let mut sm: SkipMap<_, _> = (0..100).map(|x| (x, x)).collect();
        let position = sm.find(&50);
        let old_end = sm.end();
        assert_eq!(sm.len(), 100);
        sm.clear();
        sm.check();
        assert!(sm.is_empty());
        assert_eq!(sm.begin(), sm.end());
        assert_eq!(sm.nodes.slots_len(), 2);

        sm.extend((0..60).map(|x| (x, x)));
        sm.check();
        assert_eq!(sm.len(), 60);
        assert_eq!(
            sm.get_at(position),
            Err(Error::PreconditionViolation(Precondition::ForeignPosition))
        );
        assert_eq!(
            sm.erase_at(old_end),
            Err(Error::PreconditionViolation(Precondition::ForeignPosition))
        );
        assert_eq!(sm.len(), 60);
    }

    #[rstest]
    #[case::flat("flat")]
    #[case::tallest("tallest")]
    #[case::skewed("skewed")]
    fn any_shape(#[case] name: &str) {
        let mut sm = SkipMap::with_level_generator(shape(name));
        let mut rng = StdRng::seed_from_u64(0x1234_abcd);
        let mut mirror = BTreeMap::new();
        for _ in 0..500 {
            let key = rng.random_range(0..200);
            sm.insert(key, key * 2);
            mirror.entry(key).or_insert(key * 2);
        }
        sm.check();
        assert!(sm.iter().map(|(&k, &v)| (k, v)).eq(mirror.clone()));

        for key in 0..100 {
            assert_eq!(sm.remove(&key), mirror.remove(&key));
        }
        sm.check();
        assert!(sm.iter().map(|(&k, &v)| (k, v)).eq(mirror));
    }

    #[test]
    fn shapes_are_respected() {
        let flat: SkipMap<_, _, _> = {
            let mut sm = SkipMap::with_level_generator(shape("flat"));
            sm.extend((0..50).map(|x| (x, x)));
            sm
        };
        assert!(flat.heights().iter().all(|&h| h == 1));
        assert_eq!(flat.height, 1);

        let mut tallest = SkipMap::with_level_generator(shape("tallest"));
        tallest.extend((0..50).map(|x| (x, x)));
        assert!(tallest.heights().iter().all(|&h| h == MAX_HEIGHT));
        assert_eq!(tallest.height, MAX_HEIGHT);
    }

    #[test]
    fn height_independence() -> Result<()> {
        let mut keys: Vec<u32> = (0..1000).collect();
        let mut rng = StdRng::seed_from_u64(42);

        let mut a = SkipMap::with_level_generator(Geometric::with_seed(16, 0.5, 1)?);
        for &k in &keys {
            a.insert(k, k.to_string());
        }
        for i in (1..keys.len()).rev() {
            keys.swap(i, rng.random_range(0..=i));
        }
        let mut b = SkipMap::with_level_generator(Geometric::with_seed(16, 0.5, 2)?);
        for &k in &keys {
            b.insert(k, k.to_string());
        }
        a.check();
        b.check();
        assert_ne!(a.heights(), b.heights());
        assert_eq!(a, b);
        assert_eq!(entries(&a), entries(&b));
        Ok(())
    }

    #[test]
    fn copy_is_independent() {
        let mut original: SkipMap<_, _> = (0..100).map(|x| (x, x.to_string())).collect();
        let mut copy = original.clone();
        copy.check();
        assert_eq!(copy, original);
        assert_eq!(copy.heights(), original.heights());

        copy.remove(&10);
        *copy.get_mut(&20).unwrap() = String::from("changed");
        copy.insert(1000, String::from("new"));
        assert_eq!(original.len(), 100);
        assert_eq!(original.get(&10), Some(&String::from("10")));
        assert_eq!(original.get(&20), Some(&String::from("20")));
        assert!(!original.contains_key(&1000));

        original.clear();
        assert_eq!(copy.len(), 100);
        copy.check();
    }

    #[test]
    fn copy_positions_are_foreign() {
        let original = SkipMap::from([(1, 'a'), (2, 'b')]);
        let copy = original.clone();
        let position = original.find(&1);
        assert_eq!(
            copy.get_at(position),
            Err(Error::PreconditionViolation(Precondition::ForeignPosition))
        );
        assert_eq!(copy.get_at(copy.find(&1)), Ok((&1, &'a')));
    }

    #[test]
    fn erase_with_foreign_position() {
        let mut a = SkipMap::from([(1, 'a'), (2, 'b'), (3, 'c')]);
        let mut b = SkipMap::from([(1, 'x'), (2, 'y'), (3, 'z')]);

        let from_a = a.find(&2);
        assert_eq!(
            b.erase_at(from_a),
            Err(Error::PreconditionViolation(Precondition::ForeignPosition))
        );
        let end_of_b = b.end();
        assert_eq!(
            a.erase_at(end_of_b),
            Err(Error::PreconditionViolation(Precondition::ForeignPosition))
        );

        assert_eq!(entries(&a), [(1, 'a'), (2, 'b'), (3, 'c')]);
        assert_eq!(entries(&b), [(1, 'x'), (2, 'y'), (3, 'z')]);
        a.check();
        b.check();
        assert_eq!(a.erase_at(from_a), Ok(Some((2, 'b'))));
    }

    #[test]
    fn shared_behind_a_lock() {
        let shared = Arc::new(Mutex::new(SkipMap::<i32, i32>::new()));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for i in 0..100 {
                        if let Ok(mut map) = shared.lock() {
                            map.insert(i * 4 + t, t);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }

        let map = shared.lock().unwrap_or_else(PoisonError::into_inner);
        map.check();
        assert_eq!(map.len(), 400);
        assert!(map.keys().copied().eq(0..400));
        assert_eq!(map.get(&7), Some(&3));
    }

    #[test]
    fn comparator_sent_with_map() {
        let mut sm = SkipMap::with_comparator(|a: &i32, b: &i32| b.cmp(a));
        sm.extend((0..10).map(|x| (x, x)));
        let sm = thread::spawn(move || {
            sm.insert(10, 10);
            sm
        })
        .join()
        .unwrap_or_else(|_| SkipMap::with_comparator(|a: &i32, b: &i32| a.cmp(b)));
        assert!(sm.keys().copied().eq((0..=10).rev()));
    }

    #[test]
    fn clone_from_replaces() {
        let source = SkipMap::from([(1, 1), (2, 2)]);
        let mut target = SkipMap::from([(5, 5)]);
        target.clone_from(&source);
        target.check();
        assert_eq!(target, source);
    }

    #[test]
    fn custom_comparator() {
        let mut sm = SkipMap::with_comparator(|a: &String, b: &String| {
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        });
        for word in ["pear", "fig", "banana", "kiwi", "apple", "fig"] {
            sm.insert(word.to_owned(), word.len());
        }
        sm.check();
        let keys: Vec<_> = sm.keys().map(String::as_str).collect();
        assert_eq!(keys, ["fig", "kiwi", "pear", "apple", "banana"]);
        assert_eq!(sm.get(&String::from("kiwi")), Some(&4));
    }

    #[test]
    fn find_empty() {
        let sm: SkipMap<u8, u8> = SkipMap::new();
        assert_eq!(sm.find(&3), sm.end());
        assert_eq!(sm.begin(), sm.end());
        assert!(sm.first().is_none());
        assert!(sm.last().is_none());
        assert_eq!(
            sm.get_at(sm.end()),
            Err(Error::PreconditionViolation(Precondition::PastTheEnd))
        );
    }

    #[test]
    fn erase_begin_until_empty() -> Result<()> {
        let mut sm: SkipMap<_, _> = (0..100).rev().map(|x| (x, x)).collect();
        let mut expected = 0;
        while !sm.is_empty() {
            assert_eq!(sm.erase_at(sm.begin())?, Some((expected, expected)));
            expected += 1;
        }
        sm.check();
        assert_eq!(sm.erase_at(sm.begin())?, None);
        assert_eq!(sm, SkipMap::<i32, i32>::new());
        Ok(())
    }

    #[test]
    fn positions_survive_other_changes() -> Result<()> {
        let mut sm: SkipMap<_, _> = (0..20).map(|x| (x * 2, x)).collect();
        let held: Vec<(i32, Position)> = (0..20).map(|x| (x * 2, sm.find(&(x * 2)))).collect();

        for x in 0..20 {
            sm.insert(x * 2 + 1, -x);
        }
        for x in (0..20).step_by(3) {
            sm.erase(&(x * 2))?;
        }
        sm.check();

        for (key, position) in held {
            if (key / 2) % 3 == 0 {
                assert_eq!(
                    sm.get_at(position),
                    Err(Error::PreconditionViolation(Precondition::StalePosition))
                );
                assert_eq!(
                    sm.erase_at(position),
                    Err(Error::PreconditionViolation(Precondition::StalePosition))
                );
            } else {
                assert_eq!(sm.get_at(position)?, (&key, &(key / 2)));
            }
        }
        Ok(())
    }

    #[test]
    fn get_at_mut() -> Result<()> {
        let mut sm = SkipMap::from([(1, 1), (2, 2)]);
        let (position, _) = sm.insert(3, 3);
        *sm.get_at_mut(position)?.1 = 30;
        assert_eq!(sm.get(&3), Some(&30));
        let end = sm.end();
        assert_eq!(
            sm.get_at_mut(end).err(),
            Some(Error::PreconditionViolation(Precondition::PastTheEnd))
        );
        Ok(())
    }

    #[test]
    fn before_begin_position() {
        let mut sm = SkipMap::from([(1, 1)]);
        let mut cursor = sm.cursor_front();
        cursor.move_prev();
        let before = cursor.position();
        assert_eq!(
            sm.get_at(before),
            Err(Error::PreconditionViolation(Precondition::BeforeBegin))
        );
        assert_eq!(
            sm.erase_at(before),
            Err(Error::PreconditionViolation(Precondition::BeforeBegin))
        );
        assert_eq!(sm.len(), 1);
    }

    #[test]
    fn mirrors_btreemap() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0x1234_abcd);
        let mut sm = SkipMap::new();
        let mut mirror = BTreeMap::new();
        let mut held: BTreeMap<i32, Position> = BTreeMap::new();

        for _ in 0..20_000 {
            let op: f64 = rng.random();
            let key = rng.random_range(0..1000);
            if op < 0.45 {
                let value = f64::from(key) / 2.0;
                let (position, inserted) = sm.insert(key, value);
                assert_eq!(inserted, !mirror.contains_key(&key));
                mirror.entry(key).or_insert(value);
                if let Some(&old) = held.get(&key) {
                    assert_eq!(old, position);
                }
                held.insert(key, position);
            } else if op < 0.9 {
                match held.remove(&key) {
                    Some(position) => {
                        let (k, v) = sm.erase_at(position)?.unwrap_or_default();
                        assert_eq!((k, Some(v)), (key, mirror.remove(&key)));
                    }
                    None => assert_eq!(sm.remove(&key), mirror.remove(&key)),
                }
            } else {
                for (&key, &position) in &held {
                    assert_eq!(sm.get_at(position)?, (&key, &mirror[&key]));
                }
            }
            assert_eq!(sm.len(), mirror.len());
        }
        sm.check();
        assert!(sm.iter().map(|(&k, &v)| (k, v)).eq(mirror));
        Ok(())
    }

    #[test]
    fn pop() {
        let size = 1000;
        let mut sm: SkipMap<_, _> = (0..size).map(|x| (x, 2 * x)).collect();
        assert_eq!(sm.first(), Some((&0, &0)));
        assert_eq!(sm.first_mut(), Some((&0, &mut 0)));
        assert_eq!(sm.last(), Some((&(size - 1), &(2 * size - 2))));
        assert_eq!(sm.last_mut(), Some((&(size - 1), &mut (2 * size - 2))));
        for i in 0..size {
            assert_eq!(sm[&i], 2 * i);
            assert_eq!(sm.get(&i), Some(&(2 * i)));
            assert_eq!(sm.get_mut(&i), Some(&mut (2 * i)));
        }

        for i in 0..size {
            assert_eq!(sm.pop_first(), Some((i, 2 * i)));
            assert_eq!(sm.len(), size - i - 1);
        }
        assert!(sm.pop_first().is_none());
        assert!(sm.is_empty());
        sm.check();

        let mut sm: SkipMap<_, _> = (0..size).map(|x| (x, 2 * x)).collect();
        for i in 0..size {
            assert_eq!(sm.pop_last(), Some((size - i - 1, 2 * (size - i - 1))));
            assert_eq!(sm.len(), size - i - 1);
        }
        assert!(sm.pop_last().is_none());
        assert!(sm.last().is_none());
        sm.check();
    }

    #[test]
    fn contains() {
        let (min, max) = (25, 75);
        let sm: SkipMap<_, _> = (min..max).map(|x| (x, x)).collect();

        for i in 0..100 {
            if i < min || i >= max {
                assert!(!sm.contains_key(&i));
            } else {
                assert!(sm.contains_key(&i));
            }
        }
    }

    #[test]
    fn debug_display() {
        let sm: SkipMap<_, _> = (0..4).map(|x| (x, x * x)).collect();
        assert_snapshot!(format!("{sm:?}"), @"[(0, 0), (1, 1), (2, 4), (3, 9)]");
        assert_snapshot!(format!("{sm}"), @"[(0, 0), (1, 1), (2, 4), (3, 9)]");

        let words = SkipMap::from([("b", "two"), ("a", "one")]);
        assert_snapshot!(format!("{words:?}"), @r#"[("a", "one"), ("b", "two")]"#);
        assert_snapshot!(format!("{words}"), @"[(a, one), (b, two)]");
    }

    #[test]
    fn equality() {
        let a: SkipMap<i64, i64> = (0..100).map(|x| (x, x)).collect();
        let b: SkipMap<i64, i64> = (0..100).map(|x| (x, x)).collect();
        let c: SkipMap<i64, i64> = (0..10).map(|x| (x, x)).collect();
        let d: SkipMap<i64, i64> = (100..200).map(|x| (x, x)).collect();
        let e: SkipMap<i64, i64> = (0..100).chain(0..1).map(|x| (x, x)).collect();

        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a, e);
        assert_ne!(b, c);
        assert_ne!(c, d);
        assert_ne!(d, e);

        let f: SkipMap<i64, i64> = (0..100).map(|x| (x, x + 1)).collect();
        assert_ne!(a, f);
    }

    #[test]
    fn ordering() {
        let short = SkipMap::from([(1, 'a'), (2, 'b')]);
        let long = SkipMap::from([(1, 'a'), (2, 'b'), (3, 'c')]);
        let bigger_value = SkipMap::from([(1, 'a'), (2, 'z')]);
        let bigger_key = SkipMap::from([(1, 'a'), (5, 'a')]);
        let empty: SkipMap<i32, char> = SkipMap::new();

        assert!(short < long);
        assert!(short < bigger_value);
        assert!(long < bigger_value);
        assert!(bigger_value < bigger_key);
        assert!(empty < short);
        assert_eq!(short.cmp(&short.clone()), Ordering::Equal);
        assert_eq!(long.partial_cmp(&short), Some(Ordering::Greater));
    }

    #[test]
    fn hash_matches_equality() {
        fn hash_of<T: Hash>(t: &T) -> u64 {
            let mut hasher = DefaultHasher::new();
            t.hash(&mut hasher);
            hasher.finish()
        }
        let a: SkipMap<_, _> = (0..50).map(|x| (x, x)).collect();
        let b: SkipMap<_, _> = (0..50).rev().map(|x| (x, x)).collect();
        assert_eq!(hash_of(&a), hash_of(&b));
    }
}
