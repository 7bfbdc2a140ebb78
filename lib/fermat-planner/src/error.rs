use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("invalid planner parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("dijkstra exhausted without reaching the goal")]
    NoPath,
}
