//! Error type for block-sparse tensor trains

use bstt_kernels::KernelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtError {
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Block {block} of core {core} exceeds the core shape {shape:?}")]
    BlockOutOfBounds {
        core: usize,
        block: usize,
        shape: [usize; 4],
    },

    #[error("Blocks {first} and {second} of core {core} overlap")]
    OverlappingBlocks {
        core: usize,
        first: usize,
        second: usize,
    },

    #[error("Blocks at bond {bond} cannot be moved across: {reason}")]
    IncompatibleBlocks { bond: usize, reason: String },

    #[error("Invalid ranks: {0}")]
    InvalidRanks(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Core {core} has a non-zero coefficient outside its blocks at {index:?}")]
    CoefficientOutsideBlocks { core: usize, index: [usize; 4] },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Kernel failure: {0}")]
    Kernel(#[from] KernelError),
}

/// Result alias for tensor-train operations
pub type TtResult<T> = Result<T, TtError>;
