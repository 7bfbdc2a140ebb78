//! Collision detection core: primitive shapes, an OBB-tree BVH with a
//! 15-axis SAT overlap test, a pairwise collide/separate dispatch table
//! (falling back to GJK for untabulated shape pairs), and a sweep-and-prune
//! broad phase tying it all together in [`CdContext`].

mod dispatch;
mod error;
mod geom;
mod gjk;
mod obb;
mod sap;
mod sat;
mod shapes;

pub use dispatch::{collide, separate, Contact};
pub use error::CollisionError;
pub use geom::{CdContext, CdParams, GeomId};
pub use obb::{BuildFlags, FitMode, ObbNode, ObbTree, PairOrder};
pub use sap::Sap;
pub use sat::Obb;
pub use shapes::{Pose, Shape, ShapeKind};
