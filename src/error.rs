use thiserror::Error;

use crate::values::DType;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistError {
    #[error("expected '{expected}' but got '{got}'")]
    DTypeMismatch { expected: DType, got: DType },
    #[error("shape mismatch: objects of length {left} and {right} cannot be broadcast together")]
    ShapeMismatch { left: usize, right: usize },
    #[error("output buffer has length {got}, but the broadcast shape has length {expected}")]
    OutputLength { expected: usize, got: usize },
    #[error("{name} must be square, got a {rows}x{cols} matrix")]
    NotSquare {
        name: &'static str,
        rows: usize,
        cols: usize,
    },
    #[error("{name} has dimension {got}, expected {expected}")]
    DimensionMismatch {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{name} is not positive definite")]
    NotPositiveDefinite { name: &'static str },
    #[error("{name} contains non-finite values")]
    NonFinite { name: &'static str },
    #[error("invalid value {value} for parameter {name}")]
    InvalidParameter { name: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, DistError>;
