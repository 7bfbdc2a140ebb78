//! The user-supplied operations record, reworked from the reference's
//! `fer_gng_ops_t` function-pointer table into a trait with defaulted
//! methods. `nearest` has no analogue here: the planner always resolves
//! nearest-node queries through its own [`fermat_gug::Gug`], which is the
//! entire point of pulling GUG into the core.

use fermat_math::CVec;

use crate::node::{NodeId, NodeLabel};

pub trait PlannerOps {
    /// Draws the next configuration-space sample.
    fn input_signal(&mut self) -> CVec;

    /// Classifies a point in configuration space as free or obstructed.
    fn eval(&mut self, w: &CVec) -> NodeLabel;

    /// Checked once per adaptation step; `true` ends the run.
    fn terminate(&mut self) -> bool;

    /// Straight-line connectivity test between two configurations, used
    /// both to wire the virtual start/goal nodes and, per node, while
    /// walking the extracted path.
    fn find_path(&mut self, _a: &CVec, _b: &CVec) -> bool {
        true
    }

    /// Position of a new node inserted between `a` and `b` during a growth
    /// step. Defaults to the midpoint.
    fn new_node_between(&mut self, a: &CVec, b: &CVec) -> CVec {
        a.midpoint(b)
    }

    /// Moves `from` a fraction `frac` of the way towards `to`. Defaults to
    /// linear interpolation.
    fn move_towards(&mut self, from: &mut CVec, to: &CVec, frac: f64) {
        from.move_towards(to, frac);
    }

    /// Called after a node is added to the network.
    fn new_node(&mut self, _id: NodeId, _w: &CVec) {}

    /// Called just before a node is removed from the network.
    fn del_node(&mut self, _id: NodeId) {}

    /// Periodic progress report; called every `callback_period` cycles.
    fn progress(&mut self, _cycle: u64, _node_count: usize) {}

    /// Positions for the two nodes the network is seeded with. Defaults to
    /// `None`, which tells the planner to draw two independent samples via
    /// `input_signal` instead.
    fn seed_nodes(&mut self) -> Option<(CVec, CVec)> {
        None
    }
}
