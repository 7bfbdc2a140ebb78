//! Wires a [`fermat_collision::CdContext`] obstacle scene into a
//! free/obstacle test usable as (part of) a [`crate::ops::PlannerOps::eval`]
//! implementation.
//!
//! A configuration's first two or three components are the robot's
//! translation; a six-dimensional configuration's remaining three are
//! roll/pitch/yaw, giving the 2/3/6 dimensions the planner accepts a
//! concrete reading: a point robot in the plane, a point robot in space,
//! or a rigid body moving in `SE(3)`.

use fermat_collision::{CdContext, CollisionError, GeomId};
use fermat_math::{CVec, Matrix3, Vector3};

use crate::node::NodeLabel;

pub struct CollisionEval {
    cd: CdContext,
    robot: GeomId,
    obstacles: Vec<GeomId>,
}

impl CollisionEval {
    pub fn new(cd: CdContext, robot: GeomId, obstacles: Vec<GeomId>) -> CollisionEval {
        CollisionEval { cd, robot, obstacles }
    }

    pub fn cd(&self) -> &CdContext {
        &self.cd
    }

    pub fn cd_mut(&mut self) -> &mut CdContext {
        &mut self.cd
    }

    /// Places the robot geom at `w` and tests it against every registered
    /// obstacle, stopping at the first hit.
    pub fn eval(&mut self, w: &CVec) -> Result<NodeLabel, CollisionError> {
        let tr = match w.dim() {
            2 => Vector3::new(w.get(0), w.get(1), 0.0),
            3 | 6 => Vector3::new(w.get(0), w.get(1), w.get(2)),
            _ => return Err(CollisionError::InvalidShape("configuration dimension must be 2, 3, or 6")),
        };
        self.cd.geom_set_tr(self.robot, tr)?;
        if w.dim() == 6 {
            let rot = Matrix3::from_euler(w.get(3), w.get(4), w.get(5));
            self.cd.geom_set_rot(self.robot, rot)?;
        }

        for &obstacle in &self.obstacles {
            if self.cd.geom_collide(self.robot, obstacle)? {
                return Ok(NodeLabel::Obst);
            }
        }
        Ok(NodeLabel::Free)
    }
}
