//! End-to-end workflows through the `bstt` prelude

use approx::assert_relative_eq;
use bstt::prelude::*;
use scirs2_core::ndarray_ext::{Array1, Array2};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

fn uniform_points(num_samples: usize, order: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((num_samples, order), |_| 2.0 * rng.random::<f64>() - 1.0)
}

#[test]
fn quadratic_is_recovered_through_the_prelude() -> anyhow::Result<()> {
    let points = uniform_points(40, 2, 1);
    let values: Array1<f64> = points
        .rows()
        .into_iter()
        .map(|p| 0.5 - p[0] + 2.0 * p[0] * p[1] + p[1] * p[1])
        .collect();
    let meas = legendre_measures(&points.view(), 2, -1.0, 1.0)?;
    let mut rng = StdRng::seed_from_u64(2);
    let mut tt = random_polynomial(&[2, 2], 2, &mut rng)?;

    let report = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .config(AlsConfig::default().with_target_residual(1e-10))
        .observer(NoopObserver)
        .build()?
        .run()?;
    assert_eq!(report.termination, Termination::Converged);

    let fitted = tt.evaluate_scalar(&meas)?;
    for (a, b) in fitted.iter().zip(values.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-8);
    }
    Ok(())
}

#[test]
fn sum_pattern_fit_never_increases_the_residual() -> anyhow::Result<()> {
    let points = uniform_points(60, 3, 3);
    let values: Array1<f64> = points.rows().into_iter().map(|p| (p[0] + p[1] * p[2]).cos()).collect();
    // the degree selector mode is evaluated with a constant mode of ones
    let meas = legendre_measures(&points.view(), 3, -1.0, 1.0)?.with_constant_mode(4);
    let mut rng = StdRng::seed_from_u64(4);
    let mut tt = random_homogeneous_polynomial_sum(&[3; 3], 3, &[2; 3], &mut rng)?;
    assert_eq!(tt.order(), 4);

    let mut als = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .config(AlsConfig::default().with_max_sweeps(5))
        .observer(RecordingObserver::new())
        .build()?;
    let report = als.run()?;
    assert!(report.sweeps >= 1 && report.sweeps <= 5);
    assert!(report.final_residual <= report.initial_residual * (1.0 + 1e-10));
    assert_eq!(als.observer().sweep_residuals().len(), report.sweeps);
    Ok(())
}

#[test]
fn tracing_config_is_reachable_from_the_prelude() {
    let config = TracingConfig::default().with_format(TracingFormat::Json);
    assert_eq!(config.format, TracingFormat::Json);
}
