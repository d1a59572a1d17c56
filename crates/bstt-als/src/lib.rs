//! # bstt-als
//!
//! Alternating least squares for block-sparse tensor trains.
//!
//! ## Overview
//!
//! - [`Als`] - sweep engine with cached left/right contraction stacks,
//!   minimum-norm local solves and residual-based stopping rules
//! - [`AlsConfig`] - stopping rules (`max_sweeps`, `target_residual`,
//!   `min_decrease`)
//! - [`AlsObserver`] - progress hooks; [`TracingObserver`] logs through
//!   `tracing`, [`RecordingObserver`] keeps every event
//! - [`fit_multilevel`] - block coordinate descent over a sum of trains
//!
//! Besides plain regression the engine fits coupled systems, where several
//! equations share one train through its slot axis, and gradient-augmented
//! data, where partial derivatives enter as extra least-squares rows.
//!
//! ## Quick Start
//!
//! ```rust
//! use bstt_als::{Als, AlsConfig};
//! use bstt_core::{Block, BlockSparseTT, Measurements};
//! use scirs2_core::ndarray_ext::{Array1, Array2};
//! use scirs2_core::random::{rngs::StdRng, SeedableRng};
//!
//! // y = 1 + 2x on the monomials 1, x, x²
//! let x: Array1<f64> = Array1::linspace(-1.0, 1.0, 20);
//! let mode = Array2::from_shape_fn((20, 3), |(n, e)| x[n].powi(e as i32));
//! let meas = Measurements::from_modes(vec![mode]).unwrap();
//! let y = x.mapv(|v| 1.0 + 2.0 * v);
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let mut tt = BlockSparseTT::random(&[3], &[], vec![vec![Block::new(0, 0..3, 0)]], &mut rng).unwrap();
//!
//! let mut als = Als::builder(&mut tt, &meas)
//!     .values(&y.view())
//!     .config(AlsConfig::default().with_target_residual(1e-12))
//!     .build()
//!     .unwrap();
//! let report = als.run().unwrap();
//! assert!(report.final_residual < 1e-12);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod multilevel;
pub mod observer;
pub mod report;


pub use config::{AlsConfig, MultilevelConfig};
pub use engine::{Als, AlsBuilder};
pub use error::{AlsError, AlsResult};
pub use multilevel::{fit_multilevel, MultilevelReport};
pub use observer::{
    AlsEvent, AlsObserver, InitializedEvent, MicrostepEvent, MoveEvent, NoopObserver,
    RecordingObserver, SweepEvent, TracingObserver,
};
pub use report::{SweepReport, Termination};
