
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactumError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("cardinality violation: {0}")]
    CardinalityViolation(String),
    #[error("invalid cardinality: {0}")]
    InvalidCardinality(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, FactumError>;
