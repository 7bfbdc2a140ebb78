use thiserror::Error;

#[derive(Debug, Error)]
pub enum GugError {
    #[error("invalid GUG parameter: {0}")]
    InvalidParameter(&'static str),
}
