//! Error type for basis and pattern construction

use bstt_core::TtError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BasisError {
    #[error("Invalid interval [{a}, {b}]: the left end must be smaller")]
    InvalidInterval { a: f64, b: f64 },

    #[error("Invalid degree: {0}")]
    InvalidDegree(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error(transparent)]
    Train(#[from] TtError),
}

/// Result alias for basis operations
pub type BasisResult<T> = Result<T, BasisError>;
