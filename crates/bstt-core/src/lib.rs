//! # bstt-core
//!
//! Block-sparse tensor trains: cores restricted to declared index blocks, a
//! movable orthogonality center that preserves the block structure, and
//! evaluation on batches of basis measurements.
//!
//! ## Overview
//!
//! - [`Block`] - axis-aligned box of admissible non-zeros inside a core
//! - [`BlockSparseTensor`] - a core stored as its in-block coefficients
//! - [`Coupling`] - scalar trains or coupled systems of equations
//! - [`BlockSparseTT`] - the train itself, with [`Direction`]-wise core moves
//! - [`Measurements`] - per-mode basis evaluations at sample points
//!
//! ## Quick Start
//!
//! ```rust
//! use bstt_core::{Block, BlockSparseTT, Measurements};
//! use scirs2_core::ndarray_ext::Array2;
//! use scirs2_core::random::{rngs::StdRng, SeedableRng};
//!
//! // Polynomials of total degree ≤ 1 in two variables: 1, x, y
//! let blocks = vec![
//!     vec![Block::new(0, 0, 0), Block::new(0, 1, 1)],
//!     vec![Block::new(0, 0..2, 0), Block::new(1, 0, 0)],
//! ];
//! let mut rng = StdRng::seed_from_u64(0);
//! let tt = BlockSparseTT::random(&[2, 2], &[2], blocks, &mut rng).unwrap();
//! assert_eq!(tt.dofs(), 5);
//!
//! let meas = Measurements::from_modes(vec![Array2::ones((4, 2)), Array2::ones((4, 2))]).unwrap();
//! let values = tt.evaluate_scalar(&meas).unwrap();
//! assert_eq!(values.len(), 4);
//! ```
//!
//! ## SciRS2 Integration
//!
//! Cores are `scirs2_core::ndarray_ext::Array4<f64>`; random initialization
//! uses `scirs2_core::random`; orthogonal factorizations are delegated to
//! `bstt-kernels`, which wraps `scirs2_linalg`.

pub mod block;
pub mod block_sparse;
pub mod coupling;
pub mod error;
pub mod measurements;
pub mod train;


pub use block::{merge_ranges, AxisSlice, Block};
pub use block_sparse::{validate_blocks, BlockSparseTensor};
pub use coupling::Coupling;
pub use error::{TtError, TtResult};
pub use measurements::Measurements;
pub use train::{BlockSparseTT, Direction};
