//! # bstt-basis
//!
//! Inputs for block-sparse tensor-train regression: basis measurements at
//! sample points, Sobolev Gramians of the Legendre basis and the polynomial
//! sparsity patterns.
//!
//! ## Overview
//!
//! - [`measures`] - monomial, Legendre, Hermite and trigonometric evaluations
//! - [`gramian`] - Gauss-Legendre quadrature and `H^k` Gramians
//! - [`patterns`] - block layouts for polynomials of bounded or fixed degree
//!
//! ## Quick Start
//!
//! ```rust
//! use bstt_basis::{legendre_measures, random_homogeneous_polynomial};
//! use scirs2_core::ndarray_ext::Array2;
//! use scirs2_core::random::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let tt = random_homogeneous_polynomial(&[2, 2, 2], 2, &mut rng).unwrap();
//!
//! let points = Array2::from_shape_fn((10, 3), |(n, k)| (n as f64 - 4.5) / 5.0 + 0.1 * k as f64);
//! let meas = legendre_measures(&points.view(), 2, -1.0, 1.0).unwrap();
//! let values = tt.evaluate_scalar(&meas).unwrap();
//! assert_eq!(values.len(), 10);
//! ```

pub mod error;
pub mod gramian;
pub mod measures;
pub mod patterns;

pub use error::{BasisError, BasisResult};
pub use gramian::*;
pub use measures::*;
pub use patterns::*;
