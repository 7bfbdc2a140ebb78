//! The GNG-P planner: owns the node/edge arenas, the error heap, the GUG
//! index used for nearest-node queries, and the cell-classification grid,
//! and drives the adaptation/growth/path-extraction cycle described in the
//! component design.

use fermat_gug::{Gug, GugParams};
use fermat_math::CVec;

use crate::beta_tables::{fixup_error, BetaTables};
use crate::classify::{CellLabel, ClassifyGrid};
use crate::edge::{EdgeArena, EdgeId, GngEdge};
use crate::error::PlannerError;
use crate::error_heap::ErrorHeap;
use crate::node::{GngNode, NodeArena, NodeId};
use crate::ops::PlannerOps;
use crate::path;

#[derive(Debug, Clone)]
pub struct PlannerParams {
    pub d: usize,
    /// `2*d`-length AABB: `[lo0, hi0, lo1, hi1, ...]`.
    pub aabb: Vec<f64>,
    pub start: CVec,
    pub goal: CVec,
    /// Adaptations per growth step.
    pub lambda: usize,
    pub age_max: u32,
    /// Split error decay.
    pub alpha: f64,
    /// Global error decay.
    pub beta: f64,
    /// Winner learning rate.
    pub eb: f64,
    /// Neighbour learning rate.
    pub en: f64,
    /// Adaptations before the first path-extraction attempt.
    pub warm_start: u64,
    /// Attempt path extraction every this many adaptations, once past
    /// `warm_start`. Zero disables automatic attempts.
    pub find_path_period: u64,
    pub min_nodes: usize,
    pub max_nodes: usize,
    /// How many of the nearest GNG nodes a virtual start/goal endpoint may
    /// connect to during path extraction.
    pub max_neighbors: usize,
    /// Maximum connection distance allowed for edges and for wiring a
    /// virtual start/goal endpoint; a straight-line candidate farther than
    /// this is rejected before even calling `find_path`. Not named in the
    /// reference sources available for this rewrite (see DESIGN.md); `0.0`
    /// disables the cutoff.
    pub max_dist: f64,
    /// Minimum distance a newly grown node must keep from its nearer
    /// parent; growth is retried (the usual degenerate-input path) if a
    /// candidate would land closer than this. `0.0` disables the check.
    pub min_dist: f64,
    pub gug_params: GugParams,
    pub classify_cells: usize,
}

impl PlannerParams {
    pub fn new(d: usize, aabb: Vec<f64>, start: CVec, goal: CVec) -> PlannerParams {
        let gug_params = GugParams::new(d, aabb.clone());
        PlannerParams {
            d,
            aabb,
            start,
            goal,
            lambda: 100,
            age_max: 50,
            alpha: 0.5,
            beta: 0.995,
            eb: 0.2,
            en: 0.006,
            warm_start: 0,
            find_path_period: 50,
            min_nodes: 2,
            max_nodes: 10_000,
            max_neighbors: 5,
            max_dist: 0.0,
            min_dist: 0.0,
            gug_params,
            classify_cells: 4096,
        }
    }
}

pub struct Planner {
    params: PlannerParams,
    beta_tables: BetaTables,
    arena: NodeArena,
    edges: EdgeArena,
    heap: ErrorHeap,
    gug: Gug<NodeId>,
    classify: ClassifyGrid,
    cycle: u64,
    step_in_cycle: usize,
    total_adaptations: u64,
    path: Option<Vec<CVec>>,
    skipped_degenerate: u64,
}

impl Planner {
    pub fn new<O: PlannerOps>(params: PlannerParams, ops: &mut O) -> Result<Planner, PlannerError> {
        if !matches!(params.d, 2 | 3 | 6) {
            return Err(PlannerError::InvalidParameter("dimension must be 2, 3, or 6"));
        }
        if params.aabb.len() != 2 * params.d {
            return Err(PlannerError::InvalidParameter("aabb length must be 2*d"));
        }
        for i in 0..params.d {
            if params.aabb[2 * i] >= params.aabb[2 * i + 1] {
                return Err(PlannerError::InvalidParameter("aabb is inverted or empty on some axis"));
            }
        }
        if params.lambda == 0 {
            return Err(PlannerError::InvalidParameter("lambda must be positive"));
        }
        if !(0.0..=1.0).contains(&params.alpha) {
            return Err(PlannerError::InvalidParameter("alpha must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&params.beta) {
            return Err(PlannerError::InvalidParameter("beta must be in [0, 1]"));
        }

        let gug_params = GugParams { dim: params.d, aabb: params.aabb.clone(), ..params.gug_params.clone() };
        let gug = Gug::new(gug_params).map_err(|_| PlannerError::InvalidParameter("invalid gug parameters"))?;
        let classify = ClassifyGrid::new(params.d, params.aabb.clone(), params.classify_cells);
        let beta_tables = BetaTables::new(params.beta, params.lambda);

        let mut planner = Planner {
            params,
            beta_tables,
            arena: NodeArena::new(),
            edges: EdgeArena::new(),
            heap: ErrorHeap::new(),
            gug,
            classify,
            cycle: 0,
            step_in_cycle: 0,
            total_adaptations: 0,
            path: None,
            skipped_degenerate: 0,
        };

        let (w1, w2) = ops.seed_nodes().unwrap_or_else(|| (ops.input_signal(), ops.input_signal()));
        let n1 = planner.insert_node(ops, w1);
        let n2 = planner.insert_node(ops, w2);
        planner.connect(n1, n2);

        Ok(planner)
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn path(&self) -> Option<&[CVec]> {
        self.path.as_deref()
    }

    pub fn skipped_degenerate(&self) -> u64 {
        self.skipped_degenerate
    }

    pub fn node_positions(&self) -> impl Iterator<Item = &CVec> + '_ {
        self.arena.ids().filter_map(move |id| self.arena.get(id)).map(|n| &n.w)
    }

    pub fn cell_label(&self, w: &CVec) -> CellLabel {
        self.classify.label_at(w)
    }

    /// Runs adaptation steps until the user's `terminate()` fires, a path
    /// is found (once past `warm_start`), or `max_nodes` is reached.
    pub fn run<O: PlannerOps>(&mut self, ops: &mut O) {
        loop {
            if ops.terminate() {
                break;
            }
            self.step(ops);

            if self.should_attempt_path() {
                let start = self.params.start.clone();
                let goal = self.params.goal.clone();
                let found = path::extract_path(
                    &self.arena,
                    &self.edges,
                    &self.gug,
                    &self.classify,
                    ops,
                    &start,
                    &goal,
                    self.params.max_neighbors,
                    self.params.max_dist,
                );
                if found.is_some() {
                    self.path = found;
                    break;
                }
            }

            if self.arena.len() >= self.params.max_nodes {
                break;
            }
        }
    }

    fn should_attempt_path(&self) -> bool {
        self.arena.len() >= self.params.min_nodes
            && self.total_adaptations >= self.params.warm_start
            && self.params.find_path_period > 0
            && self.total_adaptations % self.params.find_path_period == 0
    }

    /// One adaptation step (§4.6, "One adaptation step").
    pub fn step<O: PlannerOps>(&mut self, ops: &mut O) {
        self.step_in_cycle += 1;

        let mut x = ops.input_signal();
        x.clamp_to_aabb(&self.params.aabb);

        let neighbors = self.gug.nearest(&x, 2);
        if neighbors.len() < 2 {
            return;
        }
        let n1 = *self.gug.get(neighbors[0].0).expect("gug entry for live node");
        let n2 = *self.gug.get(neighbors[1].0).expect("gug entry for live node");

        let dist2 = x.dist2(&self.arena.get(n1).unwrap().w);
        let weight = self.beta_tables.winner_weight(self.step_in_cycle.min(self.params.lambda));
        self.inc_error(n1, dist2 * weight);

        let eb = self.params.eb;
        {
            let node = self.arena.get_mut(n1).unwrap();
            ops.move_towards(&mut node.w, &x, eb);
            node.w.clamp_to_aabb(&self.params.aabb);
        }
        self.resettle(ops, n1);

        // Connect (or find) the winner/runner-up edge first and reset its
        // age to zero immediately: it then ages by one like every other
        // incident edge in the loop below, ending the step at age 1.
        let incident_before = self.arena.get(n1).expect("n1 is live").edges.clone();
        let winner_edge = self.edges.find(n1, n2, &incident_before).unwrap_or_else(|| self.connect(n1, n2));
        self.edges.get_mut(winner_edge).unwrap().age = 0;

        let incident: Vec<EdgeId> = self.arena.get(n1).unwrap().edges.clone();
        let age_max = self.params.age_max;
        let mut to_move = Vec::new();
        let mut to_delete = Vec::new();
        for eid in incident {
            let edge = self.edges.get_mut(eid).unwrap();
            edge.age += 1;
            let other = edge.other(n1);
            if edge.age > age_max {
                to_delete.push((eid, other));
            } else {
                to_move.push(other);
            }
        }

        for (eid, other) in to_delete {
            self.disconnect(eid);
            let orphaned = self.arena.get(other).map(|n| n.edges.is_empty()).unwrap_or(true);
            if orphaned {
                self.delete_node(ops, other);
                to_move.retain(|&o| o != other);
            }
        }

        let en = self.params.en;
        for other in to_move {
            if let Some(node) = self.arena.get_mut(other) {
                ops.move_towards(&mut node.w, &x, en);
                node.w.clamp_to_aabb(&self.params.aabb);
            }
            self.resettle(ops, other);
        }

        if self.arena.get(n1).map(|n| n.edges.is_empty()).unwrap_or(false) {
            self.delete_node(ops, n1);
        }

        self.total_adaptations += 1;
        if self.step_in_cycle >= self.params.lambda {
            self.step_in_cycle = 0;
            self.cycle += 1;
            self.grow(ops);
            ops.progress(self.cycle, self.arena.len());
        }
    }

    /// Growth step (§4.6, "Growth step"), run every `lambda` adaptations.
    fn grow<O: PlannerOps>(&mut self, ops: &mut O) {
        let cycle = self.cycle;

        let q = loop {
            let candidate = match self.heap.peek_max(&mut self.arena, &self.beta_tables, cycle) {
                Some(id) => id,
                None => return,
            };
            let has_neighbor = self.arena.get(candidate).map(|n| !n.edges.is_empty()).unwrap_or(false);
            if has_neighbor {
                break candidate;
            }
            // Shouldn't happen under I6; guarded per the reference.
            self.delete_node(ops, candidate);
        };

        let neighbor_ids: Vec<NodeId> = self
            .arena
            .get(q)
            .unwrap()
            .edges
            .iter()
            .filter_map(|&eid| self.edges.get(eid).map(|e| e.other(q)))
            .collect();

        let mut f = None;
        let mut f_err = f64::MIN;
        for nb in neighbor_ids {
            let err = fixup_error(&mut self.arena, &self.beta_tables, cycle, nb);
            if err > f_err {
                f_err = err;
                f = Some(nb);
            }
        }
        let f = match f {
            Some(f) => f,
            None => return,
        };

        let eqf = {
            let q_edges = self.arena.get(q).unwrap().edges.clone();
            self.edges.find(q, f, &q_edges).expect("q and f are connected")
        };

        let (wq, wf) = {
            let nq = self.arena.get(q).unwrap();
            let nf = self.arena.get(f).unwrap();
            (nq.w.clone(), nf.w.clone())
        };

        if self.params.min_dist > 0.0 && wq.dist(&wf) < 2.0 * self.params.min_dist {
            self.skipped_degenerate += 1;
            return;
        }

        let new_w = ops.new_node_between(&wq, &wf);
        let r = self.insert_node(ops, new_w);

        self.disconnect(eqf);
        self.connect(q, r);
        self.connect(f, r);

        self.scale_error(q, self.params.alpha);
        self.scale_error(f, self.params.alpha);

        let r_err = {
            let eq = self.arena.get(q).unwrap().err;
            let ef = self.arena.get(f).unwrap().err;
            (eq + ef) / 2.0
        };
        if let Some(node) = self.arena.get_mut(r) {
            node.err = r_err;
            node.err_cycle = cycle;
        }
        self.heap.set(r, r_err);
    }

    fn insert_node<O: PlannerOps>(&mut self, ops: &mut O, w: CVec) -> NodeId {
        let label = ops.eval(&w);
        let placeholder = NodeId { index: 0, generation: 0 };
        let gug_id = self.gug.add(w.clone(), placeholder).expect("gug capacity");
        let id = self.arena.insert(GngNode {
            w: w.clone(),
            err: 0.0,
            err_cycle: self.cycle,
            label,
            gug_id,
            edges: Vec::new(),
        });
        *self.gug.get_mut(gug_id).expect("just inserted") = id;
        self.classify.place(id, &w, label);
        self.heap.set(id, 0.0);
        ops.new_node(id, &w);
        id
    }

    fn delete_node<O: PlannerOps>(&mut self, ops: &mut O, id: NodeId) {
        ops.del_node(id);
        self.heap.remove(id);
        self.classify.remove(id);
        if let Some(node) = self.arena.remove(id) {
            self.gug.remove(node.gug_id);
        }
    }

    fn connect(&mut self, a: NodeId, b: NodeId) -> EdgeId {
        let id = self.edges.insert(GngEdge { a, b, age: 0 });
        self.arena.get_mut(a).unwrap().edges.push(id);
        self.arena.get_mut(b).unwrap().edges.push(id);
        id
    }

    fn disconnect(&mut self, eid: EdgeId) {
        if let Some(edge) = self.edges.remove(eid) {
            if let Some(n) = self.arena.get_mut(edge.a) {
                n.edges.retain(|&e| e != eid);
            }
            if let Some(n) = self.arena.get_mut(edge.b) {
                n.edges.retain(|&e| e != eid);
            }
        }
    }

    /// Re-reads a node's error-corrected position/label into the GUG and
    /// cell-classification grid after it moves. The reference only
    /// re-evaluates free/obstacle at node creation; refreshing it here too
    /// keeps cell labels accurate as the network deforms (see DESIGN.md).
    fn resettle<O: PlannerOps>(&mut self, ops: &mut O, id: NodeId) {
        let (gug_id, w) = {
            let node = match self.arena.get(id) {
                Some(n) => n,
                None => return,
            };
            (node.gug_id, node.w.clone())
        };
        let label = ops.eval(&w);
        let _ = self.gug.update(gug_id, w.clone());
        self.classify.update(id, &w, label);
        if let Some(node) = self.arena.get_mut(id) {
            node.label = label;
        }
    }

    fn inc_error(&mut self, id: NodeId, delta: f64) {
        let cycle = self.cycle;
        fixup_error(&mut self.arena, &self.beta_tables, cycle, id);
        let new_err = {
            let node = match self.arena.get_mut(id) {
                Some(n) => n,
                None => return,
            };
            node.err += delta;
            node.err_cycle = cycle;
            node.err
        };
        self.heap.set(id, new_err);
    }

    fn scale_error(&mut self, id: NodeId, factor: f64) {
        let cycle = self.cycle;
        fixup_error(&mut self.arena, &self.beta_tables, cycle, id);
        let new_err = {
            let node = match self.arena.get_mut(id) {
                Some(n) => n,
                None => return,
            };
            node.err *= factor;
            node.err
        };
        self.heap.set(id, new_err);
    }
}
