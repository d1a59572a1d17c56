//! Polynomial Regression Example
//!
//! Fits a smooth function of several variables with block-sparse tensor
//! trains whose blocks encode a bound on the total polynomial degree, and
//! compares the total-degree pattern against a grouped homogeneous one.
//!
//! Run with:
//! ```bash
//! RUST_LOG=bstt_als=debug cargo run --example polynomial_regression
//! ```

use bstt::prelude::*;
use bstt::tracing_support::{record_metric, record_report};
use scirs2_core::ndarray_ext::{Array1, Array2};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

fn target(p: &[f64]) -> f64 {
    1.0 / (1.0 + p.iter().map(|x| x * x).sum::<f64>())
}

fn sample(num_samples: usize, order: usize, rng: &mut StdRng) -> (Array2<f64>, Array1<f64>) {
    let points = Array2::from_shape_fn((num_samples, order), |_| 2.0 * rng.random::<f64>() - 1.0);
    let values = points
        .rows()
        .into_iter()
        .map(|p| target(&p.to_vec()))
        .collect();
    (points, values)
}

fn main() -> anyhow::Result<()> {
    init_tracing(TracingConfig::from_env().with_format(TracingFormat::Compact))?;

    println!("{}", "=".repeat(80));
    println!("Block-Sparse Polynomial Regression Example");
    println!("{}", "=".repeat(80));
    println!();

    let order = 5;
    let degree = 4;
    let mut rng = StdRng::seed_from_u64(1);
    let (train_points, train_values) = sample(1000, order, &mut rng);
    let (test_points, test_values) = sample(500, order, &mut rng);

    let train_meas = legendre_measures(&train_points.view(), degree, -1.0, 1.0)?;
    let test_meas = legendre_measures(&test_points.view(), degree, -1.0, 1.0)?;

    // ========================================================================
    // Example 1: total degree <= 4
    // ========================================================================
    println!("Example 1: polynomial pattern (total degree <= {})", degree);
    println!("{}", "-".repeat(80));

    let mut tt = random_polynomial(&vec![degree; order], degree, &mut rng)?;
    println!("Ranks: {:?}", tt.ranks());
    println!("Degrees of freedom: {}", tt.dofs());

    let start = std::time::Instant::now();
    let report = Als::builder(&mut tt, &train_meas)
        .values(&train_values.view())
        .config(AlsConfig::default().with_max_sweeps(20).with_target_residual(1e-6))
        .verbosity(1)
        .build()?
        .run()?;
    let elapsed = start.elapsed();
    record_report("total_degree", &report, elapsed.as_secs_f64() * 1000.0);

    let test_error = relative_error(&tt.evaluate_scalar(&test_meas)?, &test_values);
    record_metric("total_degree_test_error", test_error);
    println!("Results:");
    println!("  - Time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);
    println!("  - {}", report);
    println!("  - Test error: {:.2e}", test_error);
    println!();

    // ========================================================================
    // Example 2: sum of homogeneous parts, grouped ranks
    // ========================================================================
    println!("Example 2: homogeneous parts with grouped ranks");
    println!("{}", "-".repeat(80));

    let mut levels = (0..=degree)
        .map(|d| {
            let group = bstt::basis::group_size(order, d);
            random_grouped_homogeneous_polynomial(&vec![degree; order], d, group, &mut rng)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let dofs: usize = levels.iter().map(|tt| tt.dofs()).sum();
    println!("Levels: {}", levels.len());
    println!("Degrees of freedom: {}", dofs);

    let start = std::time::Instant::now();
    let report = fit_multilevel(
        &mut levels,
        &train_meas,
        &train_values.view(),
        &MultilevelConfig::default()
            .with_max_iterations(5)
            .with_target_residual(1e-6),
    )?;
    let elapsed = start.elapsed();

    let mut prediction = Array1::<f64>::zeros(test_values.len());
    for tt in &levels {
        prediction += &tt.evaluate_scalar(&test_meas)?;
    }
    println!("Results:");
    println!("  - Time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);
    println!("  - Passes: {}", report.iterations);
    println!("  - Training residual: {:.2e}", report.final_residual());
    let test_error = relative_error(&prediction, &test_values);
    record_metric("multilevel_test_error", test_error);
    println!("  - Test error: {:.2e}", test_error);

    Ok(())
}

fn relative_error(prediction: &Array1<f64>, values: &Array1<f64>) -> f64 {
    let diff = prediction - values;
    diff.dot(&diff).sqrt() / values.dot(values).sqrt()
}
