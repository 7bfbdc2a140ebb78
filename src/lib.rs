//! Computational-geometry and sampling-based motion-planning toolkit.
//!
//! This crate is a thin facade over four layered sub-crates:
//!
//! - [`fermat_math`]: fixed-size vector/matrix arithmetic and the
//!   dynamic-but-small `CVec` configuration vector.
//! - [`fermat_gug`]: the generalised uniform grid, an auto-rehashing
//!   nearest-neighbour index over `ℝᵈ`.
//! - [`fermat_collision`]: an OBB-tree collision core with per-shape-pair
//!   collide/separate dispatch and a sweep-and-prune broad phase.
//! - [`fermat_planner`]: the GNG-P planner that grows a topology-learning
//!   graph over free configuration space and extracts paths from it.

pub use fermat_collision as collision;
pub use fermat_gug as gug;
pub use fermat_math as math;
pub use fermat_planner as planner;

pub use fermat_collision::{
    collide, separate, CdContext, CollisionError, Contact, GeomId, Obb, ObbNode, ObbTree, Pose,
    Sap, Shape, ShapeKind,
};
pub use fermat_gug::{ElementId, Gug, GugError, GugParams};
pub use fermat_math::{CVec, Matrix3, Quaternion, Vector2, Vector3};
pub use fermat_planner::{
    CellLabel, CollisionEval, EdgeId, NodeId, NodeLabel, Planner, PlannerError, PlannerOps,
    PlannerParams,
};
