//! The planner's second grid (distinct from the GUG): a regular grid over
//! the same AABB whose cells carry a three-state `{FREE, OBST, UNKNOWN}`
//! label, merged from the labels of the nodes currently placed in them.
//!
//! Per §4.7: a cell with at least one FREE node is FREE; a cell with no
//! FREE node but at least one OBST node is OBST; an untouched cell is
//! UNKNOWN. So FREE always wins over UNKNOWN, and OBST only wins over
//! FREE when every node in the cell is OBST.

use std::collections::HashMap;

use fermat_gug::CellCoord;
use fermat_math::CVec;

use crate::node::{NodeId, NodeLabel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellLabel {
    Free,
    Obst,
    Unknown,
}

#[derive(Default, Clone, Copy)]
struct Tally {
    free: u32,
    obst: u32,
}

impl Tally {
    fn label(&self) -> CellLabel {
        if self.free > 0 {
            CellLabel::Free
        } else if self.obst > 0 {
            CellLabel::Obst
        } else {
            CellLabel::Unknown
        }
    }

    fn add(&mut self, label: NodeLabel) {
        match label {
            NodeLabel::Free => self.free += 1,
            NodeLabel::Obst => self.obst += 1,
        }
    }

    fn sub(&mut self, label: NodeLabel) {
        match label {
            NodeLabel::Free => self.free = self.free.saturating_sub(1),
            NodeLabel::Obst => self.obst = self.obst.saturating_sub(1),
        }
    }
}

pub(crate) struct ClassifyGrid {
    dim: usize,
    aabb: Vec<f64>,
    edge: f64,
    grid_dim: Vec<i64>,
    cells: HashMap<CellCoord, Tally>,
    /// Back-pointer so a node's prior cell/label can be un-tallied on move
    /// or removal, keeping cell tallies consistent (I5's analogue here).
    membership: HashMap<NodeId, (CellCoord, NodeLabel)>,
}

impl ClassifyGrid {
    pub fn new(dim: usize, aabb: Vec<f64>, num_cells: usize) -> ClassifyGrid {
        let mut grid = ClassifyGrid {
            dim,
            aabb,
            edge: 1.0,
            grid_dim: vec![1; dim],
            cells: HashMap::new(),
            membership: HashMap::new(),
        };
        grid.rebuild_cell_shape(num_cells.max(1));
        grid
    }

    fn rebuild_cell_shape(&mut self, num_cells: usize) {
        let mut volume = 1.0;
        let mut extents = vec![0.0; self.dim];
        for i in 0..self.dim {
            extents[i] = (self.aabb[2 * i + 1] - self.aabb[2 * i]).abs();
            volume *= extents[i];
        }
        volume /= num_cells as f64;
        self.edge = volume.powf(1.0 / self.dim as f64);
        for i in 0..self.dim {
            self.grid_dim[i] = (extents[i] / self.edge) as i64 + 1;
        }
    }

    fn cell_of(&self, w: &CVec) -> CellCoord {
        let mut coords = vec![0i64; self.dim];
        for i in 0..self.dim {
            let local = w.get(i) - self.aabb[2 * i];
            let c = (local / self.edge).floor() as i64;
            coords[i] = c.clamp(0, self.grid_dim[i] - 1);
        }
        CellCoord::new(&coords)
    }

    /// Labels the cell containing `w`. `UNKNOWN` for any cell no node has
    /// ever been placed in.
    pub fn label_at(&self, w: &CVec) -> CellLabel {
        self.cells.get(&self.cell_of(w)).map(|t| t.label()).unwrap_or(CellLabel::Unknown)
    }

    /// Registers a newly created node's placement.
    pub fn place(&mut self, node: NodeId, w: &CVec, label: NodeLabel) {
        let cell = self.cell_of(w);
        self.cells.entry(cell.clone()).or_default().add(label);
        self.membership.insert(node, (cell, label));
    }

    /// Re-places a node after it moved (or was re-evaluated in place).
    pub fn update(&mut self, node: NodeId, w: &CVec, label: NodeLabel) {
        self.remove(node);
        self.place(node, w, label);
    }

    pub fn remove(&mut self, node: NodeId) {
        if let Some((cell, label)) = self.membership.remove(&node) {
            if let Some(tally) = self.cells.get_mut(&cell) {
                tally.sub(label);
                if tally.free == 0 && tally.obst == 0 {
                    self.cells.remove(&cell);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn nid(i: u32) -> NodeId {
        NodeId { index: i, generation: 0 }
    }

    #[test]
    fn free_wins_over_unknown() {
        let mut grid = ClassifyGrid::new(2, vec![0.0, 10.0, 0.0, 10.0], 100);
        let w = CVec::from_slice(&[5.0, 5.0]);
        assert_eq!(grid.label_at(&w), CellLabel::Unknown);
        grid.place(nid(0), &w, NodeLabel::Free);
        assert_eq!(grid.label_at(&w), CellLabel::Free);
    }

    #[test]
    fn obst_only_wins_when_every_node_in_cell_is_obst() {
        let mut grid = ClassifyGrid::new(2, vec![0.0, 10.0, 0.0, 10.0], 4);
        let w = CVec::from_slice(&[1.0, 1.0]);
        grid.place(nid(0), &w, NodeLabel::Obst);
        assert_eq!(grid.label_at(&w), CellLabel::Obst);

        grid.place(nid(1), &w, NodeLabel::Free);
        assert_eq!(grid.label_at(&w), CellLabel::Free);

        grid.remove(nid(1));
        assert_eq!(grid.label_at(&w), CellLabel::Obst);
    }

    #[test]
    fn moving_a_node_updates_both_cells() {
        let mut grid = ClassifyGrid::new(2, vec![0.0, 10.0, 0.0, 10.0], 100);
        let a = CVec::from_slice(&[1.0, 1.0]);
        let b = CVec::from_slice(&[9.0, 9.0]);
        grid.place(nid(0), &a, NodeLabel::Free);
        assert_eq!(grid.label_at(&a), CellLabel::Free);

        grid.update(nid(0), &b, NodeLabel::Free);
        assert_eq!(grid.label_at(&a), CellLabel::Unknown);
        assert_eq!(grid.label_at(&b), CellLabel::Free);
    }
}
