//! Positions and cursors over a [`SkipMap`].
//!
//! A cursor sits on one node of the map: an entry, the past-the-end position,
//! or the before-the-beginning position.  Moving past either end leaves the
//! cursor there; moving back from it returns to the nearest entry.
//!
//! The direction of travel is a type parameter, so that a [`Reverse`] cursor
//! started from [`cursor_back`][SkipMap::cursor_back] reads exactly like a
//! [`Forward`] one started from [`cursor_front`][SkipMap::cursor_front].

use std::{fmt, marker::PhantomData};

use crate::{
    skipmap::SkipMap,
    skipnode::{NodeId, NodeStore},
};

/// A handle to a location in a [`SkipMap`]: an entry, or one of the two ends.
///
/// Positions are obtained from [`SkipMap::find`], [`SkipMap::begin`],
/// [`SkipMap::end`], [`SkipMap::insert`] and cursors.  A position remains
/// valid until the entry it refers to is erased; inserting or erasing other
/// entries has no effect on it.  Positions of the ends stay valid until the
/// map is cleared, which retires every position handed out before.
///
/// Using a position with a map other than the one that produced it, or after
/// its entry has been erased, is reported as a
/// [`PreconditionViolation`][crate::Error::PreconditionViolation].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub(crate) map: u64,
    pub(crate) node: NodeId,
    pub(crate) generation: u64,
}

mod sealed {
    pub trait Sealed {}
}

/// The direction in which a cursor travels when moved forward.
pub trait Direction: sealed::Sealed {
    /// The direction travelling the other way.
    type Opposite: Direction;

    #[doc(hidden)]
    const REVERSED: bool;
}

/// From the first entry towards the last.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Forward;

/// From the last entry towards the first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Reverse;

impl sealed::Sealed for Forward {}
impl sealed::Sealed for Reverse {}

impl Direction for Forward {
    type Opposite = Reverse;
    const REVERSED: bool = false;
}

impl Direction for Reverse {
    type Opposite = Forward;
    const REVERSED: bool = true;
}

/// One step in direction `D`.  Both sentinels are fixed points.
#[inline]
fn step<K, V, D: Direction>(nodes: &NodeStore<K, V>, node: NodeId) -> NodeId {
    if D::REVERSED {
        nodes.prev(node)
    } else {
        nodes.link(node, 0)
    }
}

/// Where travel in direction `D` ends.
#[inline]
fn end<D: Direction>() -> NodeId {
    if D::REVERSED { NodeId::HEAD } else { NodeId::TAIL }
}

// ////////////////////////////////////////////////////////////////////////////
// Cursor
// ////////////////////////////////////////////////////////////////////////////

/// A read-only cursor over a [`SkipMap`].
///
/// `move_next` goes one entry further in direction `D`, `move_prev` one entry
/// back.
pub struct Cursor<'a, K, V, D = Forward> {
    nodes: &'a NodeStore<K, V>,
    map: u64,
    node: NodeId,
    direction: PhantomData<D>,
}

impl<'a, K, V, D: Direction> Cursor<'a, K, V, D> {
    pub(super) fn new(nodes: &'a NodeStore<K, V>, map: u64, node: NodeId) -> Self {
        Cursor {
            nodes,
            map,
            node,
            direction: PhantomData,
        }
    }

    /// Moves to the next entry.  At the end, the cursor stays put.
    #[inline]
    pub fn move_next(&mut self) {
        self.node = step::<K, V, D>(self.nodes, self.node);
    }

    /// Moves to the previous entry.  From the end this reaches the last entry
    /// visited in travel order; at the opposite end the cursor stays put.
    #[inline]
    pub fn move_prev(&mut self) {
        self.node = step::<K, V, D::Opposite>(self.nodes, self.node);
    }

    /// The entry under the cursor, or `None` at either end.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> Option<(&'a K, &'a V)> {
        self.nodes.entry(self.node)
    }

    /// The key under the cursor.
    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<&'a K> {
        self.nodes.key(self.node)
    }

    /// The value under the cursor.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&'a V> {
        self.entry().map(|(_, value)| value)
    }

    /// The entry [`move_next`][Cursor::move_next] would move to.
    #[inline]
    #[must_use]
    pub fn peek_next(&self) -> Option<(&'a K, &'a V)> {
        self.nodes.entry(step::<K, V, D>(self.nodes, self.node))
    }

    /// The entry [`move_prev`][Cursor::move_prev] would move to.
    #[inline]
    #[must_use]
    pub fn peek_prev(&self) -> Option<(&'a K, &'a V)> {
        self.nodes
            .entry(step::<K, V, D::Opposite>(self.nodes, self.node))
    }

    /// Returns `true` once the cursor has run off the end in its direction of
    /// travel.
    #[inline]
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.node == end::<D>()
    }

    /// The position of the node under the cursor.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Position {
        Position {
            map: self.map,
            node: self.node,
            generation: self.nodes.generation(self.node).unwrap_or_default(),
        }
    }

    /// The same location, travelling the other way.
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let skipmap = SkipMap::from([(1, 'a'), (2, 'b'), (3, 'c')]);
    /// let mut cursor = skipmap.cursor_front();
    /// cursor.move_next();
    /// let mut cursor = cursor.reverse();
    /// assert_eq!(cursor.key(), Some(&2));
    /// cursor.move_next();
    /// assert_eq!(cursor.key(), Some(&1));
    /// ```
    #[inline]
    #[must_use]
    pub fn reverse(self) -> Cursor<'a, K, V, D::Opposite> {
        Cursor::new(self.nodes, self.map, self.node)
    }
}

impl<K, V, D> Clone for Cursor<'_, K, V, D> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, D> Copy for Cursor<'_, K, V, D> {}

/// Cursors are equal when they sit on the same node of the same map.
impl<K, V, D> PartialEq for Cursor<'_, K, V, D> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map && self.node == other.node
    }
}

impl<K, V, D> Eq for Cursor<'_, K, V, D> {}

impl<K, V, D> fmt::Debug for Cursor<'_, K, V, D>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor")
            .field(&self.nodes.entry(self.node))
            .finish()
    }
}

// ////////////////////////////////////////////////////////////////////////////
// CursorMut
// ////////////////////////////////////////////////////////////////////////////

/// A cursor which can modify values and remove entries as it goes.
pub struct CursorMut<'a, K, V, G, D = Forward> {
    map: &'a mut SkipMap<K, V, G>,
    node: NodeId,
    direction: PhantomData<D>,
}

impl<'a, K, V, G, D: Direction> CursorMut<'a, K, V, G, D> {
    pub(super) fn new(map: &'a mut SkipMap<K, V, G>, node: NodeId) -> Self {
        CursorMut {
            map,
            node,
            direction: PhantomData,
        }
    }

    /// Moves to the next entry.  At the end, the cursor stays put.
    #[inline]
    pub fn move_next(&mut self) {
        self.node = step::<K, V, D>(&self.map.nodes, self.node);
    }

    /// Moves to the previous entry.
    #[inline]
    pub fn move_prev(&mut self) {
        self.node = step::<K, V, D::Opposite>(&self.map.nodes, self.node);
    }

    /// The entry under the cursor, or `None` at either end.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> Option<(&K, &V)> {
        self.map.nodes.entry(self.node)
    }

    /// The key under the cursor.
    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<&K> {
        self.map.nodes.key(self.node)
    }

    /// The entry under the cursor, with a mutable reference to its value.
    #[inline]
    pub fn entry_mut(&mut self) -> Option<(&K, &mut V)> {
        self.map.nodes.entry_mut(self.node)
    }

    /// The value under the cursor.
    #[inline]
    pub fn value_mut(&mut self) -> Option<&mut V> {
        self.entry_mut().map(|(_, value)| value)
    }

    /// Returns `true` once the cursor has run off the end in its direction of
    /// travel.
    #[inline]
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.node == end::<D>()
    }

    /// The position of the node under the cursor.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Position {
        self.map.position(self.node)
    }

    /// A read-only view of the cursor.
    #[inline]
    #[must_use]
    pub fn as_cursor(&self) -> Cursor<'_, K, V, D> {
        Cursor::new(&self.map.nodes, self.map.id, self.node)
    }

    /// Removes the entry under the cursor and moves to the next one.
    ///
    /// Returns `None`, without moving, at either end.
    ///
    /// ```
    /// use skipmap::SkipMap;
    ///
    /// let mut skipmap: SkipMap<_, _> = (0..10).map(|x| (x, x)).collect();
    /// let mut cursor = skipmap.cursor_front_mut();
    /// while let Some((k, _)) = cursor.entry() {
    ///     if k % 3 == 0 {
    ///         cursor.remove_current();
    ///     } else {
    ///         cursor.move_next();
    ///     }
    /// }
    /// assert_eq!(skipmap.keys().copied().collect::<Vec<_>>(), [1, 2, 4, 5, 7, 8]);
    /// ```
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        let next = step::<K, V, D>(&self.map.nodes, self.node);
        let removed = self.map.remove_node(self.node)?;
        self.node = next;
        Some(removed)
    }

    /// The same location, travelling the other way.
    #[inline]
    #[must_use]
    pub fn reverse(self) -> CursorMut<'a, K, V, G, D::Opposite> {
        CursorMut::new(self.map, self.node)
    }
}

impl<K, V, G, D> fmt::Debug for CursorMut<'_, K, V, G, D>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorMut")
            .field(&self.map.nodes.entry(self.node))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{
        error::{Error, Precondition},
        level_generator::{Cycle, MAX_HEIGHT},
        skipmap::SkipMap,
    };

    fn collect_forward<V: Copy>(sm: &SkipMap<i32, V>) -> Vec<i32> {
        let mut keys = Vec::new();
        let mut cursor = sm.cursor_front();
        while let Some((&k, _)) = cursor.entry() {
            keys.push(k);
            cursor.move_next();
        }
        assert!(cursor.is_end());
        keys
    }

    #[test]
    fn walks_both_ways() {
        let sm = SkipMap::from([(3, "c"), (1, "a"), (2, "b")]);
        assert_eq!(collect_forward(&sm), [1, 2, 3]);

        let mut cursor = sm.cursor_back();
        let mut keys = Vec::new();
        while let Some(&k) = cursor.key() {
            keys.push(k);
            cursor.move_next();
        }
        assert_eq!(keys, [3, 2, 1]);
        assert_eq!(cursor, sm.cursor_rend());
    }

    #[test]
    fn ends_are_sticky() {
        let sm = SkipMap::from([(1, 'a'), (2, 'b')]);

        let mut cursor = sm.cursor_end();
        cursor.move_next();
        assert_eq!(cursor, sm.cursor_end());
        cursor.move_prev();
        assert_eq!(cursor.entry(), Some((&2, &'b')));

        let mut cursor = sm.cursor_front();
        cursor.move_prev();
        assert!(cursor.entry().is_none());
        assert!(!cursor.is_end());
        cursor.move_prev();
        assert!(cursor.entry().is_none());
        cursor.move_next();
        assert_eq!(cursor.key(), Some(&1));

        let mut cursor = sm.cursor_rend();
        cursor.move_next();
        assert!(cursor.is_end());
        cursor.move_prev();
        assert_eq!(cursor.key(), Some(&1));
    }

    #[test]
    fn empty_map() {
        let sm: SkipMap<i32, i32> = SkipMap::new();
        assert_eq!(sm.cursor_front(), sm.cursor_end());
        assert!(sm.cursor_front().is_end());
        assert!(sm.cursor_back().is_end());
        assert_eq!(sm.cursor_front().position(), sm.end());
        assert!(sm.cursor_front().peek_next().is_none());
    }

    #[test]
    fn reverse_wraps_same_node() {
        let sm: SkipMap<_, _> = (0..5).map(|x| (x, x)).collect();
        let rbegin = sm.cursor_end().reverse();
        assert!(rbegin.entry().is_none());
        let mut cursor = rbegin;
        cursor.move_prev();
        assert!(cursor.entry().is_none());

        let mut cursor = sm.cursor_back().reverse();
        assert_eq!(cursor.key(), Some(&4));
        cursor.move_next();
        assert!(cursor.is_end());
        assert_eq!(sm.cursor_back().reverse().reverse(), sm.cursor_back());
    }

    #[test]
    fn peeking() {
        let sm = SkipMap::from([(1, 'a'), (2, 'b'), (3, 'c')]);
        let mut cursor = sm.cursor_front();
        cursor.move_next();
        assert_eq!(cursor.peek_next(), Some((&3, &'c')));
        assert_eq!(cursor.peek_prev(), Some((&1, &'a')));

        let cursor = sm.cursor_back();
        assert_eq!(cursor.peek_next(), Some((&2, &'b')));
        assert!(cursor.peek_prev().is_none());
    }

    #[test]
    fn cursor_at_position() -> Result<()> {
        let sm: SkipMap<_, _> = (0..10).map(|x| (x * 10, x)).collect();
        let mut cursor = sm.cursor_at(sm.find(&50))?;
        assert_eq!(cursor.entry(), Some((&50, &5)));
        cursor.move_next();
        assert_eq!(cursor.position(), sm.find(&60));

        let end = sm.cursor_at(sm.end())?;
        assert!(end.is_end());

        let other: SkipMap<i32, i32> = SkipMap::new();
        assert_eq!(
            other.cursor_at(sm.begin()).err(),
            Some(Error::PreconditionViolation(Precondition::ForeignPosition))
        );
        Ok(())
    }

    #[rstest]
    #[case::flat(vec![0])]
    #[case::tallest(vec![MAX_HEIGHT - 1])]
    #[case::mixed(vec![0, 3, 0, 1, 7])]
    fn remove_while_walking(#[case] levels: Vec<usize>) -> Result<()> {
        let mut sm = SkipMap::with_level_generator(Cycle::new(MAX_HEIGHT, levels)?);
        sm.extend((0..100).map(|x| (x, x)));

        let mut cursor = sm.cursor_front_mut();
        while let Some((&k, _)) = cursor.entry() {
            if k % 2 == 1 {
                assert_eq!(cursor.remove_current(), Some((k, k)));
            } else {
                cursor.move_next();
            }
        }
        assert!(cursor.remove_current().is_none());
        sm.check();
        assert!(sm.keys().copied().eq((0..100).step_by(2)));

        let mut cursor = sm.cursor_back_mut();
        while cursor.remove_current().is_some() {}
        assert!(cursor.is_end());
        assert!(sm.is_empty());
        sm.check();
        Ok(())
    }

    #[test]
    fn remove_reverse_moves_backwards() {
        let mut sm = SkipMap::from([(1, 'a'), (2, 'b'), (3, 'c')]);
        let mut cursor = sm.cursor_back_mut();
        cursor.move_next();
        assert_eq!(cursor.remove_current(), Some((2, 'b')));
        assert_eq!(cursor.key(), Some(&1));
        let cursor = cursor.reverse();
        assert_eq!(cursor.as_cursor().peek_next(), Some((&3, &'c')));
        sm.check();
    }

    #[test]
    fn modify_through_cursor() -> Result<()> {
        let mut sm: SkipMap<_, _> = (0..5).map(|x| (x, x)).collect();
        let mut cursor = sm.cursor_mut_at(sm.find(&2))?;
        if let Some(value) = cursor.value_mut() {
            *value = 20;
        }
        let position = cursor.position();
        cursor.move_prev();
        if let Some((_, value)) = cursor.entry_mut() {
            *value += 100;
        }
        assert_eq!(sm.get_at(position)?, (&2, &20));
        assert_eq!(sm.get(&1), Some(&101));
        Ok(())
    }

    #[test]
    fn debug() {
        let sm = SkipMap::from([(1, "one")]);
        let cursor = sm.cursor_front();
        assert_snapshot!(format!("{cursor:?}"), @r#"Cursor(Some((1, "one")))"#);
        assert_snapshot!(format!("{:?}", sm.cursor_end()), @"Cursor(None)");
    }
}
