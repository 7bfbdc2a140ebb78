//! GNG-P: a Growing Neural Gas planner that grows a topology-learning graph
//! online via competitive Hebbian adaptation, classifies cells free/obstacle
//! as it goes, and extracts paths from the resulting graph with Dijkstra.
//!
//! Nearest-neighbour queries are delegated throughout to a
//! [`fermat_gug::Gug`], and [`collision_eval`] gives a
//! [`fermat_collision::CdContext`] scene a ready-made [`ops::PlannerOps::eval`].

mod beta_tables;
mod classify;
mod collision_eval;
mod edge;
mod error;
mod error_heap;
mod node;
mod ops;
mod path;
mod planner;

pub use classify::CellLabel;
pub use collision_eval::CollisionEval;
pub use edge::EdgeId;
pub use error::PlannerError;
pub use node::{NodeId, NodeLabel};
pub use ops::PlannerOps;
pub use planner::{Planner, PlannerParams};
