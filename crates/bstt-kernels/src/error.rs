//! Error types for block-sparse tensor-train kernels
//!
//! Every kernel validates its operand shapes up front and reports failures
//! through [`KernelError`], carrying the name of the operation that failed.

use std::fmt;

/// Error type for kernel operations
#[derive(Debug, Clone, PartialEq)]
pub enum KernelError {
    /// Dimension mismatch between operands
    DimensionMismatch {
        operation: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
        context: String,
    },

    /// Empty input not allowed
    EmptyInput {
        operation: String,
        parameter: String,
    },

    /// Slot index outside the slot axis of a core
    InvalidSlot {
        operation: String,
        slot: usize,
        num_slots: usize,
    },

    /// Matrix expected to be symmetric is not
    NotSymmetric {
        operation: String,
        max_deviation: f64,
    },

    /// Matrix expected to be positive semi-definite has a negative eigenvalue
    NotPositiveSemidefinite {
        operation: String,
        min_eigenvalue: f64,
    },

    /// Failure inside a dense factorization routine
    FactorizationFailed {
        operation: String,
        message: String,
    },

    /// Generic operation error with context
    OperationError { operation: String, message: String },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::DimensionMismatch {
                operation,
                expected,
                actual,
                context,
            } => write!(
                f,
                "{}: dimension mismatch - expected {:?}, got {:?}. {}",
                operation, expected, actual, context
            ),

            KernelError::EmptyInput {
                operation,
                parameter,
            } => write!(
                f,
                "{}: empty input not allowed for parameter '{}'",
                operation, parameter
            ),

            KernelError::InvalidSlot {
                operation,
                slot,
                num_slots,
            } => write!(
                f,
                "{}: slot {} out of range for core with {} slots",
                operation, slot, num_slots
            ),

            KernelError::NotSymmetric {
                operation,
                max_deviation,
            } => write!(
                f,
                "{}: matrix is not symmetric (max deviation {:e})",
                operation, max_deviation
            ),

            KernelError::NotPositiveSemidefinite {
                operation,
                min_eigenvalue,
            } => write!(
                f,
                "{}: matrix is not positive semi-definite (min eigenvalue {:e})",
                operation, min_eigenvalue
            ),

            KernelError::FactorizationFailed { operation, message } => {
                write!(f, "{}: factorization failed: {}", operation, message)
            }

            KernelError::OperationError { operation, message } => {
                write!(f, "{}: {}", operation, message)
            }
        }
    }
}

impl std::error::Error for KernelError {}

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

impl KernelError {
    /// Create a dimension mismatch error
    pub fn dimension_mismatch(
        operation: impl Into<String>,
        expected: Vec<usize>,
        actual: Vec<usize>,
        context: impl Into<String>,
    ) -> Self {
        KernelError::DimensionMismatch {
            operation: operation.into(),
            expected,
            actual,
            context: context.into(),
        }
    }

    /// Create an empty input error
    pub fn empty_input(operation: impl Into<String>, parameter: impl Into<String>) -> Self {
        KernelError::EmptyInput {
            operation: operation.into(),
            parameter: parameter.into(),
        }
    }

    /// Create an invalid slot error
    pub fn invalid_slot(operation: impl Into<String>, slot: usize, num_slots: usize) -> Self {
        KernelError::InvalidSlot {
            operation: operation.into(),
            slot,
            num_slots,
        }
    }

    /// Create a non-symmetric matrix error
    pub fn not_symmetric(operation: impl Into<String>, max_deviation: f64) -> Self {
        KernelError::NotSymmetric {
            operation: operation.into(),
            max_deviation,
        }
    }

    /// Create an indefinite matrix error
    pub fn not_positive_semidefinite(operation: impl Into<String>, min_eigenvalue: f64) -> Self {
        KernelError::NotPositiveSemidefinite {
            operation: operation.into(),
            min_eigenvalue,
        }
    }

    /// Wrap a failure reported by a dense linear algebra routine
    pub fn factorization_failed(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        KernelError::FactorizationFailed {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Create a generic operation error
    pub fn operation_error(operation: impl Into<String>, message: impl Into<String>) -> Self {
        KernelError::OperationError {
            operation: operation.into(),
            message: message.into(),
        }
    }
}
