//! Node arena: a growable array keyed by a generation-tagged [`NodeId`],
//! replacing the reference's intrusive `fer_net_node_t` list membership.

use fermat_gug::{ElementId, Gug, GugParams};
use fermat_math::CVec;

use crate::edge::EdgeId;

/// Free/obstacle label of a single sample, as returned by the user's
/// evaluator. Distinct from [`crate::classify::CellLabel`], which also has
/// an `Unknown` state for cells no node has ever visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLabel {
    Free,
    Obst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

pub struct GngNode {
    pub w: CVec,
    pub err: f64,
    pub err_cycle: u64,
    pub label: NodeLabel,
    /// This node's own registration in the planner's [`fermat_gug::Gug`].
    pub gug_id: ElementId,
    /// Incident edges; a node reaching zero here is deleted immediately (I6).
    pub edges: Vec<EdgeId>,
}

struct NodeSlot {
    generation: u32,
    node: Option<GngNode>,
}

/// Stable-index arena over [`GngNode`]s. Mirrors the slot/free-list layout
/// used by `fermat_gug::Gug` and `fermat_collision::CdContext`.
pub struct NodeArena {
    slots: Vec<NodeSlot>,
    free_list: Vec<u32>,
    len: usize,
}

impl NodeArena {
    pub fn new() -> NodeArena {
        NodeArena { slots: Vec::new(), free_list: Vec::new(), len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, node: GngNode) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId { index, generation: slot.generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(NodeSlot { generation: 0, node: Some(node) });
        NodeId { index, generation: 0 }
    }

    pub fn get(&self, id: NodeId) -> Option<&GngNode> {
        self.slots.get(id.index as usize).and_then(|slot| {
            (slot.generation == id.generation).then(|| slot.node.as_ref()).flatten()
        })
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut GngNode> {
        self.slots.get_mut(id.index as usize).and_then(|slot| {
            (slot.generation == id.generation).then(|| slot.node.as_mut()).flatten()
        })
    }

    pub fn remove(&mut self, id: NodeId) -> Option<GngNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.node.is_none() {
            return None;
        }
        let node = slot.node.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.len -= 1;
        node
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|_| NodeId { index: index as u32, generation: slot.generation })
        })
    }
}

impl Default for NodeArena {
    fn default() -> NodeArena {
        NodeArena::new()
    }
}
