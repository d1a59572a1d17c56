//! Error type for ALS engines

use bstt_core::TtError;
use bstt_kernels::KernelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlsError {
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid Gramian for mode {mode}: {source}")]
    InvalidGramian {
        mode: usize,
        #[source]
        source: KernelError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid gradient setup: {0}")]
    InvalidGradients(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Tensor train error: {0}")]
    Train(#[from] TtError),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),
}

/// Result alias for ALS operations
pub type AlsResult<T> = Result<T, AlsError>;
