//! Iterators over a [`SkipMap`][super::SkipMap].
//!
//! All of them walk lane 0 from both ends at once, using the forward links
//! from the front and the backward links from the back, and stop once the
//! number of entries handed out reaches the length of the map.

use std::{iter::FusedIterator, marker::PhantomData};

use crate::skipnode::{NodeId, NodeStore, Slot};

// ////////////////////////////////////////////////////////////////////////////
// Iter
// ////////////////////////////////////////////////////////////////////////////

/// Borrowing iterator over the entries of a map, in order.
pub struct Iter<'a, K, V> {
    nodes: &'a NodeStore<K, V>,
    front: NodeId,
    back: NodeId,
    size: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(nodes: &'a NodeStore<K, V>, len: usize) -> Self {
        Iter {
            nodes,
            front: nodes.link(NodeId::HEAD, 0),
            back: nodes.prev(NodeId::TAIL),
            size: len,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            return None;
        }
        let nodes = self.nodes;
        let entry = nodes.entry(self.front)?;
        self.front = nodes.link(self.front, 0);
        self.size -= 1;
        Some(entry)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.size, Some(self.size))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            return None;
        }
        let nodes = self.nodes;
        let entry = nodes.entry(self.back)?;
        self.back = nodes.prev(self.back);
        self.size -= 1;
        Some(entry)
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    #[inline]
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

// ////////////////////////////////////////////////////////////////////////////
// IterMut
// ////////////////////////////////////////////////////////////////////////////

/// Iterator over the entries of a map, with mutable references to the values.
pub struct IterMut<'a, K, V> {
    slots: *mut Slot<K, V>,
    front: NodeId,
    back: NodeId,
    size: usize,
    marker: PhantomData<&'a mut NodeStore<K, V>>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(super) fn new(nodes: &'a mut NodeStore<K, V>, len: usize) -> Self {
        let front = nodes.link(NodeId::HEAD, 0);
        let back = nodes.prev(NodeId::TAIL);
        IterMut {
            slots: nodes.slots_mut_ptr(),
            front,
            back,
            size: len,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            return None;
        }
        // SAFETY: `front` is a live node of the store borrowed for `'a`.  Each
        // node is visited once, from one end or the other, as `size` counts
        // the nodes not yet handed out; so no two references created here
        // alias.
        let node = unsafe { &mut (*self.slots.add(self.front.index())).node };
        self.front = node.links[0];
        self.size -= 1;
        node.entry.as_mut().map(|(k, v)| (&*k, v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.size, Some(self.size))
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            return None;
        }
        // SAFETY: as in `next`.
        let node = unsafe { &mut (*self.slots.add(self.back.index())).node };
        self.back = node.prev;
        self.size -= 1;
        node.entry.as_mut().map(|(k, v)| (&*k, v))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

// SAFETY: the raw pointer stands in for the `&'a mut NodeStore` the iterator
// was built from, and only ever yields `&K` and `&mut V`.
unsafe impl<K: Sync, V: Send> Send for IterMut<'_, K, V> {}
// SAFETY: a shared `IterMut` gives no access to the entries at all.
unsafe impl<K: Sync, V: Sync> Sync for IterMut<'_, K, V> {}

// ////////////////////////////////////////////////////////////////////////////
// IntoIter
// ////////////////////////////////////////////////////////////////////////////

/// Consuming iterator over the entries of a map, in order.
pub struct IntoIter<K, V> {
    nodes: NodeStore<K, V>,
    front: NodeId,
    back: NodeId,
    size: usize,
}

impl<K, V> IntoIter<K, V> {
    pub(super) fn new(nodes: NodeStore<K, V>, len: usize) -> Self {
        let front = nodes.link(NodeId::HEAD, 0);
        let back = nodes.prev(NodeId::TAIL);
        IntoIter {
            nodes,
            front,
            back,
            size: len,
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            return None;
        }
        let id = self.front;
        self.front = self.nodes.link(id, 0);
        self.size -= 1;
        self.nodes.destroy(id)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.size, Some(self.size))
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            return None;
        }
        let id = self.back;
        self.back = self.nodes.prev(id);
        self.size -= 1;
        self.nodes.destroy(id)
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

// ////////////////////////////////////////////////////////////////////////////
// Keys and values
// ////////////////////////////////////////////////////////////////////////////

/// Iterator over the keys of a map, in order.
pub struct Keys<'a, K, V>(pub(super) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over the values of a map, in key order.
pub struct Values<'a, K, V>(pub(super) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Iterator over mutable references to the values of a map, in key order.
pub struct ValuesMut<'a, K, V>(pub(super) IterMut<'a, K, V>);

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for ValuesMut<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}
