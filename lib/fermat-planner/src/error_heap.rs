//! Error-ranked priority structure standing in for the reference's
//! intrusive pairing heap (`fer_pairheap_t`).
//!
//! The reference's heap comparator (`errHeapLT`) fixes up both compared
//! nodes' decayed error before every comparison, so "heap order" there is
//! really "order recomputed fresh at comparison time", not an invariant
//! maintained continuously. Since decay only ever lowers a node's error, a
//! stored key is always a valid upper bound on its true current value.
//! That licenses a lazy decrease-key scheme over a plain
//! [`std::collections::BinaryHeap`]: pop the stale max, fix it up for
//! real, and compare the corrected value against the next entry's
//! (still-stale) key — itself an upper bound on everything below it. If
//! the corrected value is still `>=` that bound, it is definitively the
//! global max; otherwise requeue it with its now-exact key and continue
//! with the next entry as the new candidate.
//!
//! Every node is a permanent heap member (added on creation, removed on
//! deletion); [`ErrorHeap::peek_max`] never discards the true maximum, it
//! only ever re-settles which stale entry currently describes it — mirroring
//! the reference's `ferPairHeapMin` (peek) plus `ferPairHeapUpdate`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::beta_tables::{fixup_error, BetaTables};
use crate::node::{NodeArena, NodeId};

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    key: f64,
    node: NodeId,
    epoch: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.total_cmp(&other.key)
    }
}

pub(crate) struct ErrorHeap {
    heap: BinaryHeap<HeapEntry>,
    epochs: HashMap<NodeId, u64>,
}

impl ErrorHeap {
    pub fn new() -> ErrorHeap {
        ErrorHeap { heap: BinaryHeap::new(), epochs: HashMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    /// Registers `node` (if new) or refreshes its key (if already present).
    /// Used both for `nodeAdd` and for `ferPairHeapUpdate` after a node's
    /// error changes.
    pub fn set(&mut self, node: NodeId, key: f64) {
        let epoch = self.epochs.entry(node).or_insert(0);
        *epoch += 1;
        self.heap.push(HeapEntry { key, node, epoch: *epoch });
    }

    /// Drops `node`'s membership. Its stale heap entries are discarded the
    /// next time they would otherwise surface at the top.
    pub fn remove(&mut self, node: NodeId) {
        self.epochs.remove(&node);
    }

    fn pop_valid(&mut self) -> Option<HeapEntry> {
        while let Some(e) = self.heap.pop() {
            if self.epochs.get(&e.node) == Some(&e.epoch) {
                return Some(e);
            }
        }
        None
    }

    /// Re-inserts `node` at `key` without bumping its epoch, since this
    /// just tightens an already-current entry rather than recording a new
    /// external update.
    fn requeue(&mut self, node: NodeId, key: f64) {
        if let Some(&epoch) = self.epochs.get(&node) {
            self.heap.push(HeapEntry { key, node, epoch });
        }
    }

    /// Returns the node of maximum fixed-up error, applying lazy decay to
    /// `arena` in the process (I4). `None` if the heap is empty.
    pub fn peek_max(&mut self, arena: &mut NodeArena, beta: &BetaTables, cycle: u64) -> Option<NodeId> {
        let mut top = self.pop_valid()?;
        let mut top_val = fixup_error(arena, beta, cycle, top.node);
        loop {
            match self.pop_valid() {
                None => {
                    self.requeue(top.node, top_val);
                    return Some(top.node);
                }
                Some(next) => {
                    if top_val >= next.key {
                        self.heap.push(next);
                        self.requeue(top.node, top_val);
                        return Some(top.node);
                    }
                    self.requeue(top.node, top_val);
                    top = next;
                    top_val = fixup_error(arena, beta, cycle, top.node);
                }
            }
        }
    }
}

impl Default for ErrorHeap {
    fn default() -> ErrorHeap {
        ErrorHeap::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fermat_gug::{Gug, GugParams};
    use fermat_math::CVec;
    use crate::node::{GngNode, NodeLabel};

    fn node(arena: &mut NodeArena, gug: &mut Gug<()>, err: f64, cycle: u64) -> NodeId {
        let gug_id = gug.add(CVec::from_slice(&[0.0, 0.0]), ()).unwrap();
        arena.insert(GngNode { w: CVec::from_slice(&[0.0, 0.0]), err, err_cycle: cycle, label: NodeLabel::Free, gug_id, edges: Vec::new() })
    }

    #[test]
    fn peek_max_returns_the_largest_fixed_up_error() {
        let mut arena = NodeArena::new();
        let mut gug: Gug<()> = Gug::new(GugParams::new(2, vec![0.0, 1.0, 0.0, 1.0])).unwrap();
        let beta = BetaTables::new(1.0, 10); // no decay, so insertion order of keys is exact.

        let a = node(&mut arena, &mut gug, 1.0, 0);
        let b = node(&mut arena, &mut gug, 5.0, 0);
        let c = node(&mut arena, &mut gug, 3.0, 0);

        let mut heap = ErrorHeap::new();
        heap.set(a, 1.0);
        heap.set(b, 5.0);
        heap.set(c, 3.0);

        assert_eq!(heap.peek_max(&mut arena, &beta, 0), Some(b));
        // Peeking again must not remove membership.
        assert_eq!(heap.peek_max(&mut arena, &beta, 0), Some(b));
    }

    #[test]
    fn set_updates_take_effect_on_next_peek() {
        let mut arena = NodeArena::new();
        let mut gug: Gug<()> = Gug::new(GugParams::new(2, vec![0.0, 1.0, 0.0, 1.0])).unwrap();
        let beta = BetaTables::new(1.0, 10);

        let a = node(&mut arena, &mut gug, 1.0, 0);
        let b = node(&mut arena, &mut gug, 2.0, 0);

        let mut heap = ErrorHeap::new();
        heap.set(a, 1.0);
        heap.set(b, 2.0);
        assert_eq!(heap.peek_max(&mut arena, &beta, 0), Some(b));

        arena.get_mut(a).unwrap().err = 10.0;
        heap.set(a, 10.0);
        assert_eq!(heap.peek_max(&mut arena, &beta, 0), Some(a));
    }

    #[test]
    fn removed_node_is_skipped() {
        let mut arena = NodeArena::new();
        let mut gug: Gug<()> = Gug::new(GugParams::new(2, vec![0.0, 1.0, 0.0, 1.0])).unwrap();
        let beta = BetaTables::new(1.0, 10);

        let a = node(&mut arena, &mut gug, 1.0, 0);
        let b = node(&mut arena, &mut gug, 2.0, 0);

        let mut heap = ErrorHeap::new();
        heap.set(a, 1.0);
        heap.set(b, 2.0);
        heap.remove(b);
        arena.remove(b);

        assert_eq!(heap.peek_max(&mut arena, &beta, 0), Some(a));
    }

    #[test]
    fn decay_changes_the_winner_over_cycles() {
        let mut arena = NodeArena::new();
        let mut gug: Gug<()> = Gug::new(GugParams::new(2, vec![0.0, 1.0, 0.0, 1.0])).unwrap();
        let beta = BetaTables::new(0.5, 1);

        // `a` has a high error fixed at cycle 0; `b` has a lower error
        // fixed more recently. After enough cycles `a`'s decayed error
        // should fall below `b`'s.
        let a = node(&mut arena, &mut gug, 100.0, 0);
        let b = node(&mut arena, &mut gug, 10.0, 9);

        let mut heap = ErrorHeap::new();
        heap.set(a, 100.0);
        heap.set(b, 10.0);

        assert_eq!(heap.peek_max(&mut arena, &beta, 10), Some(b));
    }
}
