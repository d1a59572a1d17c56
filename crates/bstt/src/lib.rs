//! # bstt - Block-Sparse Tensor Trains
//!
//! Regression with tensor trains whose components are confined to declared
//! blocks, fitted by alternating least squares.
//!
//! This is the **meta crate** that re-exports all bstt components for convenient access.
//!
//! ## Quick Start
//!
//! ```
//! use bstt::prelude::*;
//! use scirs2_core::ndarray_ext::{Array1, Array2};
//! use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let points = Array2::from_shape_fn((200, 3), |_| 2.0 * rng.random::<f64>() - 1.0);
//! let values: Array1<f64> = points.rows().into_iter().map(|p| p[0] * p[1] + p[2]).collect();
//!
//! let meas = legendre_measures(&points.view(), 2, -1.0, 1.0)?;
//! let mut tt = random_polynomial(&[2, 2, 2], 2, &mut rng)?;
//!
//! let mut als = Als::builder(&mut tt, &meas)
//!     .values(&values.view())
//!     .config(AlsConfig::default().with_max_sweeps(20))
//!     .build()?;
//! let report = als.run()?;
//! println!("{}", report);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Components
//!
//! ### Dense kernels ([`kernels`])
//!
//! Stack contractions, orthogonal factorizations, minimum-norm least
//! squares and PSD checks.
//!
//! ### Trains ([`core`])
//!
//! [`Block`](core::Block) descriptors, [`BlockSparseTT`](core::BlockSparseTT)
//! with a movable orthogonality center, [`Measurements`](core::Measurements)
//! and [`Coupling`](core::Coupling) for systems of equations.
//!
//! ### Bases and patterns ([`basis`])
//!
//! Monomial, Legendre, Hermite and sine-cosine measurements, Legendre
//! Sobolev Gramians, and block patterns for full, polynomial and
//! homogeneous polynomial trains.
//!
//! ### Fitting ([`als`])
//!
//! The [`Als`](als::Als) sweep engine, stopping rules, observers and the
//! multilevel fit of a sum of trains.
//!
//! ## Features
//!
//! - `tracing` (default): [`tracing_support::init_tracing`] installs a
//!   `tracing-subscriber` pipeline; without it the function is a no-op
//! - `serde`: `Serialize`/`Deserialize` for the ALS configs and reports
//!
//! ## Examples
//!
//! See the `examples/` directory of this crate.

pub use bstt_als as als;
pub use bstt_basis as basis;
pub use bstt_core as core;
pub use bstt_kernels as kernels;

pub mod tracing_support;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! # Example
    //!
    //! ```
    //! use bstt::prelude::*;
    //!
    //! let tt = BlockSparseTT::zeros(&[2], &[], vec![vec![Block::new(0, 0..2, 0)]]).unwrap();
    //! assert_eq!(tt.dofs(), 2);
    //! ```

    // Trains
    pub use crate::core::{Block, BlockSparseTT, Coupling, Direction, Measurements};

    // Bases and patterns
    pub use crate::basis::{
        hermite_measures, legendre_gramian, legendre_measures, legendre_measures_with_derivatives,
        monomial_measures, monomial_measures_with_derivatives, random_full,
        random_grouped_homogeneous_polynomial, random_homogeneous_polynomial,
        random_homogeneous_polynomial_sum, random_homogeneous_polynomial_sum_system,
        random_polynomial, sine_cosine_measures, Pattern,
    };

    // Fitting
    pub use crate::als::{
        fit_multilevel, Als, AlsConfig, AlsObserver, MultilevelConfig, NoopObserver,
        RecordingObserver, SweepReport, Termination, TracingObserver,
    };

    // Logging
    pub use crate::tracing_support::{init_tracing, TracingConfig, TracingFormat};
}
