//! Storage for the nodes of a [`SkipMap`][crate::SkipMap].
//!
//! All nodes, including the two sentinels, live in a single arena and refer
//! to one another by [`NodeId`].  The arena owns every node; links are plain
//! indices, so there are no ownership cycles to untangle when nodes are
//! spliced in or out.
//!
//! ```text
//! slot 0: <head> links -> first node on each lane, prev -> <head>
//! slot 1: <tail> links -> <tail>,                  prev -> last node
//! slot n: [k, v] links -> next node on each lane,  prev -> previous node
//! ```

use crate::error::{Error, Result};

/// Minimum levels required for a list of size n.
pub fn levels_required(n: usize) -> usize {
    if n == 0 {
        1
    } else {
        let num_bits = usize::BITS;
        (num_bits - n.leading_zeros()) as usize
    }
}

// ////////////////////////////////////////////////////////////////////////////
// NodeId
// ////////////////////////////////////////////////////////////////////////////

/// Index of a node within a [`NodeStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The head sentinel, preceding every entry.
    pub const HEAD: Self = NodeId(0);
    /// The tail sentinel, the past-the-end marker.
    pub const TAIL: Self = NodeId(1);

    /// Returns `true` if this is the head or the tail.
    #[inline]
    pub fn is_sentinel(self) -> bool {
        self == Self::HEAD || self == Self::TAIL
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

// ////////////////////////////////////////////////////////////////////////////
// SkipNode
// ////////////////////////////////////////////////////////////////////////////

/// A single record of the map.
///
/// The node has a height which corresponds to how many lanes it takes part
/// in; `links` always has exactly that many elements.  `links[k]` is the next
/// node which also reaches lane `k`, or the tail if there is none.
///
/// `prev` is the immediately preceding node on lane 0, which allows the map
/// to be walked backwards.
#[derive(Debug)]
pub struct SkipNode<K, V> {
    // `None` for the sentinels and for freed slots.
    pub entry: Option<(K, V)>,
    pub prev: NodeId,
    pub links: Vec<NodeId>,
}

impl<K, V> SkipNode<K, V> {
    /// An empty sentinel spanning `ceiling` lanes, all of which end at the
    /// tail.
    fn sentinel(ceiling: usize) -> Self {
        SkipNode {
            entry: None,
            prev: NodeId::HEAD,
            links: vec![NodeId::TAIL; ceiling],
        }
    }

    /// A freed slot.
    fn vacant() -> Self {
        SkipNode {
            entry: None,
            prev: NodeId::HEAD,
            links: Vec::new(),
        }
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.links.len()
    }

    #[inline]
    pub fn key(&self) -> Option<&K> {
        self.entry.as_ref().map(|entry| &entry.0)
    }
}

/// A slot in the arena.  The generation is bumped whenever the slot's node is
/// destroyed, so that handles to the old node can be told apart from handles
/// to whatever is stored there next.
#[derive(Debug)]
pub struct Slot<K, V> {
    pub generation: u64,
    pub node: SkipNode<K, V>,
}

// ////////////////////////////////////////////////////////////////////////////
// NodeStore
// ////////////////////////////////////////////////////////////////////////////

/// The arena holding every node of a map.
#[derive(Debug)]
pub struct NodeStore<K, V> {
    slots: Vec<Slot<K, V>>,
    free: Vec<NodeId>,
    ceiling: usize,
}

impl<K, V> NodeStore<K, V> {
    /// Create a store whose sentinels span `ceiling` lanes.
    pub fn new(ceiling: usize) -> Self {
        let mut store = NodeStore {
            slots: Vec::with_capacity(2),
            free: Vec::new(),
            ceiling,
        };
        for _ in 0..2 {
            store.slots.push(Slot {
                generation: 0,
                node: SkipNode::sentinel(ceiling),
            });
        }
        store
    }

    /// The number of lanes spanned by the sentinels.
    #[inline]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Allocate a node holding `entry` which takes part in `height` lanes.
    ///
    /// Every lane of the new node initially points at the tail; splicing it
    /// into the list is left to the caller.
    pub fn create(&mut self, entry: (K, V), height: usize) -> Result<NodeId> {
        debug_assert!(
            (1..=self.ceiling).contains(&height),
            "height {height} outside of [1, {}]",
            self.ceiling
        );
        let mut links = Vec::new();
        links
            .try_reserve_exact(height)
            .map_err(|_err| Error::AllocationFailure)?;
        links.resize(height, NodeId::TAIL);

        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.slots
                    .try_reserve(1)
                    .map_err(|_err| Error::AllocationFailure)?;
                self.slots.push(Slot {
                    generation: 0,
                    node: SkipNode::vacant(),
                });
                NodeId(self.slots.len() - 1)
            }
        };
        self.slots[id.0].node = SkipNode {
            entry: Some(entry),
            prev: NodeId::HEAD,
            links,
        };
        Ok(id)
    }

    /// Free the node, returning its entry.
    ///
    /// The links of neighbouring nodes are left untouched, so the node must
    /// have been spliced out beforehand.  Returns `None` for the sentinels
    /// and for slots which are already free.
    pub fn destroy(&mut self, id: NodeId) -> Option<(K, V)> {
        if id.is_sentinel() {
            return None;
        }
        let slot = self.slots.get_mut(id.0)?;
        let entry = slot.node.entry.take()?;
        slot.node = SkipNode::vacant();
        // A 64-bit counter cannot wrap within the lifetime of a process.
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id);
        Some(entry)
    }

    /// Put both sentinels back into the empty-list state: every lane of the
    /// head points to the tail, the tail points to itself, and both
    /// backward links point to the head.
    pub fn reset_sentinels(&mut self) {
        self.slots[NodeId::HEAD.0].node = SkipNode::sentinel(self.ceiling);
        self.slots[NodeId::TAIL.0].node = SkipNode::sentinel(self.ceiling);
    }

    /// Free every node reachable on lane 0 and reset the sentinels, returning
    /// the number of nodes freed.
    ///
    /// The arena is shrunk back to the two sentinels, which also forgets the
    /// slot generations; the owner must stop honouring older handles.
    pub fn clear(&mut self) -> usize {
        let mut freed = 0;
        let mut current = self.link(NodeId::HEAD, 0);
        while current != NodeId::TAIL {
            let next = self.link(current, 0);
            if self.destroy(current).is_some() {
                freed += 1;
            }
            current = next;
        }
        self.slots.truncate(2);
        self.slots.shrink_to_fit();
        self.free = Vec::new();
        self.reset_sentinels();
        freed
    }

    // /////////////////////////////
    // Accessors
    // /////////////////////////////

    #[inline]
    pub fn node(&self, id: NodeId) -> &SkipNode<K, V> {
        &self.slots[id.0].node
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut SkipNode<K, V> {
        &mut self.slots[id.0].node
    }

    /// Returns `true` if `id` refers to a sentinel or to a node holding an
    /// entry.
    #[inline]
    pub fn is_live(&self, id: NodeId) -> bool {
        id.is_sentinel()
            || self
                .slots
                .get(id.0)
                .is_some_and(|slot| slot.node.entry.is_some())
    }

    #[inline]
    pub fn generation(&self, id: NodeId) -> Option<u64> {
        self.slots.get(id.0).map(|slot| slot.generation)
    }

    #[inline]
    pub fn link(&self, id: NodeId, lane: usize) -> NodeId {
        self.node(id).links[lane]
    }

    #[inline]
    pub fn set_link(&mut self, id: NodeId, lane: usize, to: NodeId) {
        self.node_mut(id).links[lane] = to;
    }

    #[inline]
    pub fn prev(&self, id: NodeId) -> NodeId {
        self.node(id).prev
    }

    #[inline]
    pub fn set_prev(&mut self, id: NodeId, to: NodeId) {
        self.node_mut(id).prev = to;
    }

    #[inline]
    pub fn height(&self, id: NodeId) -> usize {
        self.node(id).height()
    }

    #[inline]
    pub fn key(&self, id: NodeId) -> Option<&K> {
        self.node(id).key()
    }

    #[inline]
    pub fn entry(&self, id: NodeId) -> Option<(&K, &V)> {
        self.node(id).entry.as_ref().map(|(k, v)| (k, v))
    }

    #[inline]
    pub fn entry_mut(&mut self, id: NodeId) -> Option<(&K, &mut V)> {
        self.node_mut(id).entry.as_mut().map(|(k, v)| (&*k, v))
    }

    #[cfg(test)]
    pub fn slots_len(&self) -> usize {
        self.slots.len()
    }

    /// Raw access to the slots, for iterators handing out disjoint mutable
    /// borrows of several entries at once.
    #[inline]
    pub fn slots_mut_ptr(&mut self) -> *mut Slot<K, V> {
        self.slots.as_mut_ptr()
    }
}
