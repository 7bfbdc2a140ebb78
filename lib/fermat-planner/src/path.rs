//! Path extraction: virtual start/goal nodes wired to the nearest reachable
//! real nodes, then Dijkstra over the combined graph.
//!
//! Each real node carries its own Dijkstra bookkeeping only implicitly,
//! through the `dist`/`prev` maps below — the reference threads a record
//! directly onto `fer_gng_node_t`, but since nodes here are arena-indexed
//! rather than pointer-linked there is no need to mutate the node itself.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use fermat_gug::Gug;
use fermat_math::CVec;

use crate::classify::{CellLabel, ClassifyGrid};
use crate::edge::EdgeArena;
use crate::node::{NodeArena, NodeId, NodeLabel};
use crate::ops::PlannerOps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DNode {
    Start,
    Goal,
    Real(NodeId),
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    dist: f64,
    node: DNode,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}
impl Eq for QueueEntry {}
impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, Dijkstra wants the smallest.
        other.dist.total_cmp(&self.dist)
    }
}

/// Connects a virtual endpoint at `w` to up to `max_neighbors` of the
/// nearest real nodes the evaluator allows a straight motion to, skipping
/// any that currently sit in an OBST cell or sit farther than `max_dist`
/// (when positive).
#[allow(clippy::too_many_arguments)]
fn virtual_links<O: PlannerOps>(
    w: &CVec,
    gug: &Gug<NodeId>,
    arena: &NodeArena,
    classify: &ClassifyGrid,
    ops: &mut O,
    max_neighbors: usize,
    max_dist: f64,
) -> Vec<(NodeId, f64)> {
    let mut links = Vec::new();
    for (el, _) in gug.nearest(w, max_neighbors) {
        let Some(&node_id) = gug.get(el) else { continue };
        let Some(node) = arena.get(node_id) else { continue };
        if classify.label_at(&node.w) == CellLabel::Obst {
            continue;
        }
        let d = w.dist(&node.w);
        if max_dist > 0.0 && d > max_dist {
            continue;
        }
        if ops.find_path(w, &node.w) {
            links.push((node_id, d));
        }
    }
    links
}

/// Runs Dijkstra from `start` to `goal` over the GNG graph, wired in via
/// virtual endpoints. Returns the path as a list of configurations
/// (`start` first, `goal` last), or `None` if the goal is unreachable.
#[allow(clippy::too_many_arguments)]
pub(crate) fn extract_path<O: PlannerOps>(
    arena: &NodeArena,
    edges: &EdgeArena,
    gug: &Gug<NodeId>,
    classify: &ClassifyGrid,
    ops: &mut O,
    start: &CVec,
    goal: &CVec,
    max_neighbors: usize,
    max_dist: f64,
) -> Option<Vec<CVec>> {
    let start_links = virtual_links(start, gug, arena, classify, ops, max_neighbors, max_dist);
    let goal_links = virtual_links(goal, gug, arena, classify, ops, max_neighbors, max_dist);
    if start_links.is_empty() || goal_links.is_empty() {
        return None;
    }
    let goal_reach: HashMap<NodeId, f64> = goal_links.iter().copied().collect();

    let mut dist: HashMap<DNode, f64> = HashMap::new();
    let mut prev: HashMap<DNode, DNode> = HashMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(DNode::Start, 0.0);
    heap.push(QueueEntry { dist: 0.0, node: DNode::Start });

    while let Some(QueueEntry { dist: d, node }) = heap.pop() {
        if d > *dist.get(&node).unwrap_or(&f64::INFINITY) {
            continue;
        }
        if node == DNode::Goal {
            break;
        }

        let neighbors: Vec<(DNode, f64)> = match node {
            DNode::Start => start_links.iter().map(|&(id, w)| (DNode::Real(id), w)).collect(),
            DNode::Goal => Vec::new(),
            DNode::Real(id) => {
                let Some(n) = arena.get(id) else { continue };
                // Fresh evaluation, per the goal-reachability and barrier
                // rules: a node that now reads OBST is skipped even if it
                // was FREE when the cell tally was last updated.
                if matches!(ops.eval(&n.w), NodeLabel::Obst) {
                    continue;
                }
                let mut out: Vec<(DNode, f64)> = n
                    .edges
                    .iter()
                    .filter_map(|&eid| edges.get(eid))
                    .map(|e| {
                        let other = e.other(id);
                        let ow = &arena.get(other).unwrap().w;
                        (DNode::Real(other), n.w.dist(ow))
                    })
                    .collect();
                if let Some(&gd) = goal_reach.get(&id) {
                    out.push((DNode::Goal, gd));
                }
                out
            }
        };

        for (next, cost) in neighbors {
            let cand = d + cost;
            if cand < *dist.get(&next).unwrap_or(&f64::INFINITY) {
                dist.insert(next, cand);
                prev.insert(next, node);
                heap.push(QueueEntry { dist: cand, node: next });
            }
        }
    }

    if !dist.contains_key(&DNode::Goal) {
        return None;
    }

    let mut path_nodes = vec![DNode::Goal];
    let mut cur = DNode::Goal;
    while let Some(&p) = prev.get(&cur) {
        path_nodes.push(p);
        cur = p;
    }
    path_nodes.reverse();

    let mut path = Vec::with_capacity(path_nodes.len());
    for n in path_nodes {
        match n {
            DNode::Start => path.push(start.clone()),
            DNode::Goal => path.push(goal.clone()),
            DNode::Real(id) => path.push(arena.get(id)?.w.clone()),
        }
    }
    Some(path)
}
