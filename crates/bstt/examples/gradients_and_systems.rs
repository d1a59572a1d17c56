//! Gradient-Augmented and Coupled Fits Example
//!
//! Shows the two non-scalar ways of feeding data to the ALS engine:
//! partial derivatives as extra least-squares rows (with `H¹` Sobolev
//! Gramians for the norm report), and coupled systems whose equations share
//! one train through its slot axis. Results are also emitted as `tracing`
//! events.
//!
//! Run with:
//! ```bash
//! cargo run --example gradients_and_systems
//! ```

use bstt::basis::random_full_system;
use bstt::prelude::*;
use bstt::tracing_support::{record_metric, record_report};
use scirs2_core::ndarray_ext::{array, Array1, Array2};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

fn main() -> anyhow::Result<()> {
    init_tracing(TracingConfig::from_env())?;

    println!("{}", "=".repeat(80));
    println!("Gradient-Augmented and Coupled Fits Example");
    println!("{}", "=".repeat(80));
    println!();

    // ========================================================================
    // Example 1: values and gradients of exp(-x·y) on [-1, 1]²
    // ========================================================================
    println!("Example 1: fitting values and gradients");
    println!("{}", "-".repeat(80));

    let degree = 6;
    let mut rng = StdRng::seed_from_u64(3);
    let points = Array2::from_shape_fn((80, 2), |_| 2.0 * rng.random::<f64>() - 1.0);
    let values: Array1<f64> = points.rows().into_iter().map(|p| (-p[0] * p[1]).exp()).collect();
    let gradients = Array2::from_shape_fn((80, 2), |(n, k)| {
        let (x, y) = (points[[n, 0]], points[[n, 1]]);
        let other = if k == 0 { y } else { x };
        -other * (-x * y).exp()
    });

    let (meas, derivatives) = legendre_measures_with_derivatives(&points.view(), degree, -1.0, 1.0)?;
    let gramian = legendre_gramian(degree + 1, 1, -1.0, 1.0)?;
    let mut tt = random_polynomial(&[degree, degree], degree, &mut rng)?;

    let start = std::time::Instant::now();
    let observer = {
        let mut als = Als::builder(&mut tt, &meas)
            .values(&values.view())
            .gradients(&derivatives, &gradients.view())
            .gramians(vec![gramian.clone(), gramian])
            .config(AlsConfig::default().with_max_sweeps(15).with_target_residual(1e-9))
            .observer(RecordingObserver::new())
            .build()?;
        println!("Samples: {}", als.num_samples());
        println!("Channels per sample: {}", als.num_channels());
        als.run()?;
        let norm = als.gramian_norm()?;
        println!("H¹ norm of the fit: {:.6}", norm);
        record_metric("h1_norm", norm);
        als.into_observer()
    };
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    for (sweep, residual) in observer.sweep_residuals().iter().enumerate() {
        println!("  sweep {:>2}: residual {:.3e}", sweep + 1, residual);
    }
    if let Some(report) = observer.termination() {
        println!("Stopped: {}", report.termination);
        record_report("values_and_gradients", report, elapsed_ms);
    }
    println!();

    // ========================================================================
    // Example 2: two equations sharing one train
    // ========================================================================
    println!("Example 2: coupled system on trigonometric features");
    println!("{}", "-".repeat(80));

    // Equation 0 reads slot 0 of both modes, equation 1 reads slot 1.
    let selection = array![[0, 0], [1, 1]];
    let truth = random_full_system(&[4, 4], &[2, 2], 4, selection.clone(), &mut rng)?;
    let mut tt = random_full_system(&[4, 4], &[2, 2], 4, selection, &mut rng)?;

    let points = Array2::from_shape_fn((100, 2), |_| rng.random::<f64>() * std::f64::consts::TAU);
    let meas = sine_cosine_measures(&points.view(), 5)?;
    let targets = truth.evaluate(&meas)?;
    println!("Equations: {}", tt.num_equations());
    println!("Targets: {:?}", targets.dim());

    let start = std::time::Instant::now();
    let report = Als::builder(&mut tt, &meas)
        .system_values(&targets.view())
        .config(AlsConfig::default().with_target_residual(1e-10))
        .build()?
        .run()?;
    record_report("coupled_system", &report, start.elapsed().as_secs_f64() * 1000.0);
    println!("  - {}", report);
    println!("  - Converged: {}", report.termination.is_converged());
    println!();

    // ========================================================================
    // Example 3: sums of homogeneous polynomials as a coupled system
    // ========================================================================
    println!("Example 3: homogeneous polynomial sums for three equations");
    println!("{}", "-".repeat(80));

    // The last column reads the single slot of the degree mode.
    let selection = array![[0, 0, 0, 0], [1, 0, 1, 0], [1, 1, 0, 0]];
    let truth = random_homogeneous_polynomial_sum_system(
        &[3, 3, 3],
        &[2, 2, 2],
        3,
        2,
        selection.clone(),
        &mut rng,
    )?;
    let mut tt = random_homogeneous_polynomial_sum_system(
        &[3, 3, 3],
        &[2, 2, 2],
        3,
        2,
        selection,
        &mut rng,
    )?;
    println!("Ranks: {:?}", tt.ranks());
    println!("Degrees of freedom: {}", tt.dofs());

    let points = Array2::from_shape_fn((300, 3), |_| 2.0 * rng.random::<f64>() - 1.0);
    let meas = legendre_measures(&points.view(), 3, -1.0, 1.0)?.with_constant_mode(4);
    let targets = truth.evaluate(&meas)?;

    let start = std::time::Instant::now();
    let report = Als::builder(&mut tt, &meas)
        .system_values(&targets.view())
        .config(AlsConfig::default().with_max_sweeps(30).with_target_residual(1e-10))
        .build()?
        .run()?;
    record_report("homogeneous_sum_system", &report, start.elapsed().as_secs_f64() * 1000.0);
    println!("  - {}", report);

    Ok(())
}
