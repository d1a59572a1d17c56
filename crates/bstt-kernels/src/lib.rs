//! # bstt-kernels
//!
//! Numerical kernels behind alternating least squares on block-sparse tensor
//! trains.
//!
//! ## Overview
//!
//! - **Stack contractions** - extend left/right sample stacks by one core, for
//!   any number of right-hand-side channels
//! - **Gramian contractions** - extend Gramian stacks and evaluate the
//!   Gramian-weighted norm of a train
//! - **Orthogonal factorization** - thin `QR`/`LQ` splits for tall and wide
//!   matrices, used when the train's core moves
//! - **Minimum-norm least squares** - SVD pseudo-inverse solve that tolerates
//!   rank deficiency
//! - **Spectral checks** - symmetric positive semi-definite validation
//!
//! ## Quick Start
//!
//! ```rust
//! use scirs2_core::ndarray_ext::array;
//! use bstt_kernels::min_norm_lstsq_vec;
//!
//! // Underdetermined system: the minimum-norm solution is returned.
//! let a = array![[1.0, 1.0]];
//! let b = array![2.0];
//! let x = min_norm_lstsq_vec(&a.view(), &b.view()).unwrap();
//! assert!((x[0] - 1.0).abs() < 1e-12);
//! assert!((x[1] - 1.0).abs() < 1e-12);
//! ```
//!
//! ## SciRS2 Integration
//!
//! Arrays come from `scirs2_core::ndarray_ext`; QR, SVD and symmetric
//! eigen-decompositions come from `scirs2_linalg`.

pub mod contractions;
pub mod error;
pub mod factorize;
pub mod lstsq;
pub mod spectral;


// Re-exports
pub use contractions::*;
pub use error::{KernelError, KernelResult};
pub use factorize::*;
pub use lstsq::*;
pub use spectral::*;
