//! End-to-end behaviour of the ALS engine on polynomial data.

use approx::assert_relative_eq;
use bstt_als::*;
use bstt_basis::*;
use bstt_core::{Block, BlockSparseTT, Direction, Measurements};
use scirs2_core::ndarray_ext::{array, Array1, Array2};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

fn uniform_points(num_samples: usize, order: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((num_samples, order), |_| 2.0 * rng.random::<f64>() - 1.0)
}

fn outside_blocks_are_zero(tt: &BlockSparseTT) -> bool {
    (0..tt.order()).all(|k| {
        tt.component(k).indexed_iter().all(|((l, e, s, r), &v)| {
            v == 0.0 || tt.blocks(k).iter().any(|b| b.contains([l, e, s, r]))
        })
    })
}

fn affine(points: &Array2<f64>) -> Array1<f64> {
    points
        .rows()
        .into_iter()
        .map(|p| 0.5 + p[0] - 2.0 * p[1] + 0.3 * p[2])
        .collect()
}

#[test]
fn degree_one_data_is_recovered_within_ten_sweeps() -> anyhow::Result<()> {
    let points = uniform_points(40, 3, 1);
    let meas = legendre_measures(&points.view(), 1, -1.0, 1.0)?;
    let values = affine(&points);
    let mut rng = StdRng::seed_from_u64(2);
    let mut tt = random_polynomial(&[1, 1, 1], 1, &mut rng)?;

    let mut als = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .config(AlsConfig::default().with_max_sweeps(10).with_target_residual(1e-11))
        .observer(RecordingObserver::new())
        .build()?;
    let report = als.run()?;

    assert!(report.sweeps <= 10);
    assert!(report.final_residual < 1e-10);
    let residuals = als.observer().sweep_residuals();
    assert!(residuals[0] <= report.initial_residual + 1e-12);
    for pair in residuals.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-12);
    }
    Ok(())
}

#[test]
fn run_stops_at_first_sweep_below_target() -> anyhow::Result<()> {
    let points = uniform_points(40, 3, 3);
    let meas = legendre_measures(&points.view(), 1, -1.0, 1.0)?;
    let values = affine(&points);
    let mut rng = StdRng::seed_from_u64(4);
    let mut tt = random_polynomial(&[1, 1, 1], 1, &mut rng)?;

    let target = 1e-9;
    let mut als = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .config(AlsConfig::default().with_target_residual(target))
        .observer(RecordingObserver::new())
        .build()?;
    let report = als.run()?;

    assert_eq!(report.termination, Termination::Converged);
    let residuals = als.observer().sweep_residuals();
    assert_eq!(residuals.len(), report.sweeps);
    let (last, earlier) = residuals.split_last().expect("at least one sweep");
    assert!(*last < target);
    assert!(earlier.iter().all(|&r| r >= target));
    assert!(als.residual()? < target);
    assert_eq!(als.observer().termination(), Some(&report));
    Ok(())
}

fn oscillating(points: &Array2<f64>) -> Array1<f64> {
    points.rows().into_iter().map(|p| (3.0 * p.sum()).sin()).collect()
}

#[test]
fn unfittable_data_stalls() -> anyhow::Result<()> {
    // the best affine fit of sin(3(x + y)) keeps almost all of the signal,
    // so no sweep can shrink the residual elevenfold
    let points = uniform_points(40, 2, 30);
    let meas = legendre_measures(&points.view(), 1, -1.0, 1.0)?;
    let values = oscillating(&points);
    let mut rng = StdRng::seed_from_u64(31);
    let mut tt = random_polynomial(&[1, 1], 1, &mut rng)?;

    let report = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .config(AlsConfig::default().with_max_sweeps(50).with_min_decrease(10.0))
        .build()?
        .run()?;
    assert_eq!(report.termination, Termination::Stalled);
    assert_eq!(report.sweeps, 1);
    assert!(report.final_residual < report.initial_residual);
    assert!(report.final_residual > 0.5);
    Ok(())
}

#[test]
fn sweep_budget_ends_the_run() -> anyhow::Result<()> {
    let points = uniform_points(40, 2, 32);
    let meas = legendre_measures(&points.view(), 1, -1.0, 1.0)?;
    let values = oscillating(&points);
    let mut rng = StdRng::seed_from_u64(33);
    let mut tt = random_polynomial(&[1, 1], 1, &mut rng)?;

    let mut als = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .config(AlsConfig::default().with_max_sweeps(1).with_min_decrease(0.0))
        .observer(RecordingObserver::new())
        .build()?;
    let report = als.run()?;
    assert_eq!(report.termination, Termination::MaxSweeps);
    assert_eq!(report.sweeps, 1);
    assert_eq!(als.observer().sweep_residuals().len(), 1);
    assert!(report.final_residual < report.initial_residual);
    Ok(())
}

#[test]
fn univariate_identity_in_legendre_basis() -> anyhow::Result<()> {
    let x = Array1::linspace(-1.0, 1.0, 50);
    let points = x.clone().insert_axis(scirs2_core::ndarray_ext::Axis(1));
    let meas = legendre_measures(&points.view(), 2, -1.0, 1.0)?;
    let mut rng = StdRng::seed_from_u64(5);
    let mut tt = BlockSparseTT::random(&[3], &[], vec![vec![Block::new(0, 0..3, 0)]], &mut rng)?;

    let mut als = Als::builder(&mut tt, &meas)
        .values(&x.view())
        .config(AlsConfig::default().with_max_sweeps(5).with_target_residual(1e-10))
        .build()?;
    let report = als.run()?;

    assert!(report.sweeps <= 5);
    assert!(report.final_residual < 1e-10);
    drop(als);

    // y = x = P_1 / √3
    let coefficients = tt.component(0);
    assert_relative_eq!(coefficients[[0, 1, 0, 0]], 1.0 / 3f64.sqrt(), epsilon = 1e-10);
    assert!(coefficients[[0, 0, 0, 0]].abs() < 1e-10);
    assert!(coefficients[[0, 2, 0, 0]].abs() < 1e-10);
    Ok(())
}

#[test]
fn underdetermined_microstep_returns_minimum_norm_solution() -> anyhow::Result<()> {
    // Two samples, three unknowns.
    let a = array![[1.0, 2.0, 0.0], [0.0, 1.0, 1.0]];
    let y = array![1.0, 2.0];
    let meas = Measurements::from_modes(vec![a.clone()])?;
    let mut tt = BlockSparseTT::zeros(&[3], &[], vec![vec![Block::new(0, 0..3, 0)]])?;

    let mut als = Als::new(&mut tt, &meas, &y.view())?;
    als.microstep()?;
    drop(als);

    // x = Aᵀ (A Aᵀ)⁻¹ y with A Aᵀ = [[5, 2], [2, 2]]
    let det = 5.0 * 2.0 - 2.0 * 2.0;
    let w = array![(2.0 * y[0] - 2.0 * y[1]) / det, (-2.0 * y[0] + 5.0 * y[1]) / det];
    let expected = a.t().dot(&w);
    for e in 0..3 {
        assert_relative_eq!(tt.component(0)[[0, e, 0, 0]], expected[e], epsilon = 1e-10);
    }
    Ok(())
}

#[test]
fn sweeps_keep_block_structure() -> anyhow::Result<()> {
    let points = uniform_points(30, 4, 6);
    let meas = legendre_measures(&points.view(), 3, -1.0, 1.0)?;
    let values: Array1<f64> = points.rows().into_iter().map(|p| (p.sum()).cos()).collect();
    let mut rng = StdRng::seed_from_u64(7);
    let mut tt = random_grouped_homogeneous_polynomial(&[3; 4], 3, 2, &mut rng)?;

    {
        let mut als = Als::builder(&mut tt, &meas)
            .values(&values.view())
            .config(AlsConfig::default().with_max_sweeps(3))
            .build()?;
        als.run()?;
    }
    assert!(outside_blocks_are_zero(&tt));
    Ok(())
}

#[test]
fn core_round_trip_keeps_predictions() -> anyhow::Result<()> {
    let points = uniform_points(25, 4, 8);
    let meas = legendre_measures(&points.view(), 2, -1.0, 1.0)?;
    let values = Array1::ones(25);
    let mut rng = StdRng::seed_from_u64(9);
    let mut tt = random_polynomial(&[2; 4], 2, &mut rng)?;
    let before = tt.evaluate_scalar(&meas)?;

    let mut als = Als::new(&mut tt, &meas, &values.view())?;
    let start = als.prediction()?;
    for _ in 0..3 {
        als.move_core(Direction::Right)?;
        assert_eq!(als.left_stack().len() + als.right_stack().len(), 5);
    }
    for _ in 0..3 {
        als.move_core(Direction::Left)?;
    }
    let end = als.prediction()?;
    for (a, b) in start.iter().zip(end.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-10);
    }
    drop(als);

    let after = tt.evaluate_scalar(&meas)?;
    for (a, b) in before.iter().zip(after.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-10);
    }
    Ok(())
}

#[test]
fn coupled_system_is_fitted() -> anyhow::Result<()> {
    let selection = array![[0, 0], [1, 1]];
    let mut rng = StdRng::seed_from_u64(10);
    let truth = random_full_system(&[2, 2], &[2, 2], 3, selection.clone(), &mut rng)?;
    let mut tt = random_full_system(&[2, 2], &[2, 2], 3, selection, &mut rng)?;

    let points = uniform_points(30, 2, 11);
    let meas = legendre_measures(&points.view(), 2, -1.0, 1.0)?;
    let targets = truth.evaluate(&meas)?;
    assert_eq!(targets.dim(), (30, 2));

    let mut als = Als::builder(&mut tt, &meas)
        .system_values(&targets.view())
        .config(AlsConfig::default().with_target_residual(1e-10))
        .build()?;
    let report = als.run()?;
    assert!(report.final_residual < 1e-10);
    drop(als);

    let fitted = tt.evaluate(&meas)?;
    for (a, b) in fitted.iter().zip(targets.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-8);
    }
    Ok(())
}

#[test]
fn homogeneous_sum_system_is_fitted() -> anyhow::Result<()> {
    // two equations with their own slots on both input modes
    let selection = array![[0, 0, 0], [1, 1, 0]];
    let mut rng = StdRng::seed_from_u64(34);
    let truth = random_homogeneous_polynomial_sum_system(
        &[2, 2],
        &[2, 2],
        2,
        2,
        selection.clone(),
        &mut rng,
    )?;
    let mut tt =
        random_homogeneous_polynomial_sum_system(&[2, 2], &[2, 2], 2, 2, selection, &mut rng)?;

    let points = uniform_points(40, 2, 35);
    let meas = legendre_measures(&points.view(), 2, -1.0, 1.0)?.with_constant_mode(3);
    let targets = truth.evaluate(&meas)?;
    assert_eq!(targets.dim(), (40, 2));

    let mut als = Als::builder(&mut tt, &meas)
        .system_values(&targets.view())
        .config(AlsConfig::default().with_target_residual(1e-10))
        .build()?;
    let report = als.run()?;
    assert_eq!(report.termination, Termination::Converged);
    drop(als);

    assert!(outside_blocks_are_zero(&tt));
    let fitted = tt.evaluate(&meas)?;
    for (a, b) in fitted.iter().zip(targets.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-8);
    }
    Ok(())
}

#[test]
fn gradient_channels_fit_values_and_derivatives() -> anyhow::Result<()> {
    let points = uniform_points(20, 2, 12);
    let (meas, derivatives) = legendre_measures_with_derivatives(&points.view(), 2, -1.0, 1.0)?;
    let f = |x: f64, y: f64| x * x + x * y - 0.5 * y + 0.25;
    let values: Array1<f64> = points.rows().into_iter().map(|p| f(p[0], p[1])).collect();
    let gradients = Array2::from_shape_fn((20, 2), |(n, p)| {
        let (x, y) = (points[[n, 0]], points[[n, 1]]);
        if p == 0 {
            2.0 * x + y
        } else {
            x - 0.5
        }
    });

    let mut rng = StdRng::seed_from_u64(13);
    let mut tt = random_polynomial(&[2, 2], 2, &mut rng)?;
    let mut als = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .gradients(&derivatives, &gradients.view())
        .config(AlsConfig::default().with_target_residual(1e-10))
        .build()?;
    assert_eq!(als.num_channels(), 3);
    let report = als.run()?;
    assert!(report.final_residual < 1e-10);
    drop(als);

    let fitted = tt.evaluate_scalar(&meas)?;
    for (a, b) in fitted.iter().zip(values.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-8);
    }
    Ok(())
}

#[test]
fn multilevel_fit_of_homogeneous_levels() -> anyhow::Result<()> {
    let points = uniform_points(200, 2, 14);
    let meas = legendre_measures(&points.view(), 2, -1.0, 1.0)?;
    let values: Array1<f64> = points
        .rows()
        .into_iter()
        .map(|p| 0.3 + p[0] - p[1] + 0.5 * p[0] * p[1] + p[0] * p[0])
        .collect();

    let mut rng = StdRng::seed_from_u64(15);
    let mut trains = (0..=2)
        .map(|degree| random_homogeneous_polynomial(&[2, 2], degree, &mut rng))
        .collect::<Result<Vec<_>, _>>()?;

    let report = fit_multilevel(
        &mut trains,
        &meas,
        &values.view(),
        &MultilevelConfig::default().with_target_residual(1e-8),
    )?;
    assert!(report.final_residual() < 1e-8);
    assert_eq!(report.level_reports.len(), 3);

    let mut sum = Array1::<f64>::zeros(200);
    for tt in &trains {
        sum += &tt.evaluate_scalar(&meas)?;
    }
    for (a, b) in sum.iter().zip(values.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn identity_gramian_norm_is_core_norm() -> anyhow::Result<()> {
    let points = uniform_points(10, 3, 16);
    let meas = legendre_measures(&points.view(), 2, -1.0, 1.0)?;
    let values = Array1::ones(10);
    let mut rng = StdRng::seed_from_u64(17);
    // one rank group per bond, so the non-active cores are orthonormal
    let mut tt = random_full(&[2; 3], 3, &mut rng)?;

    let mut als = Als::new(&mut tt, &meas, &values.view())?;
    assert_relative_eq!(als.gramian_norm()?, als.train().core_norm(), epsilon = 1e-10);
    als.move_core(Direction::Right)?;
    assert_relative_eq!(als.gramian_norm()?, als.train().core_norm(), epsilon = 1e-10);
    Ok(())
}

#[test]
fn sobolev_gramians_are_accepted() -> anyhow::Result<()> {
    let points = uniform_points(10, 2, 18);
    let meas = legendre_measures(&points.view(), 2, -1.0, 1.0)?;
    let values = Array1::ones(10);
    let mut rng = StdRng::seed_from_u64(19);
    let mut tt = random_polynomial(&[2, 2], 2, &mut rng)?;
    let gram = legendre_gramian(3, 1, -1.0, 1.0)?;

    let als = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .gramians(vec![gram.clone(), gram])
        .build()?;
    assert!(als.gramian_norm()? > 0.0);
    Ok(())
}

#[test]
fn validation_errors_leave_the_train_untouched() -> anyhow::Result<()> {
    let points = uniform_points(10, 3, 20);
    let meas = legendre_measures(&points.view(), 1, -1.0, 1.0)?;
    let mut rng = StdRng::seed_from_u64(21);
    let mut tt = random_polynomial(&[1, 1, 1], 1, &mut rng)?;
    tt.canonicalize(1)?;
    let before = tt.clone();

    let unchanged = |tt: &BlockSparseTT| {
        tt.core_position() == before.core_position() && tt.components() == before.components()
    };

    let short = Array1::ones(9);
    let err = Als::new(&mut tt, &meas, &short.view()).err();
    assert!(matches!(err, Some(AlsError::ShapeMismatch(_))));
    assert!(unchanged(&tt));

    let values = Array1::ones(10);
    let asymmetric = array![[1.0, 0.5], [0.0, 1.0]];
    let err = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .gramians(vec![Array2::eye(2), asymmetric, Array2::eye(2)])
        .build()
        .err();
    assert!(matches!(err, Some(AlsError::InvalidGramian { mode: 1, .. })));
    assert!(unchanged(&tt));

    let indefinite = array![[1.0, 2.0], [2.0, 1.0]];
    let err = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .gramians(vec![Array2::eye(2), Array2::eye(2), indefinite])
        .build()
        .err();
    assert!(matches!(err, Some(AlsError::InvalidGramian { mode: 2, .. })));
    assert!(unchanged(&tt));

    let wrong_order = legendre_measures(&uniform_points(10, 2, 22).view(), 1, -1.0, 1.0)?;
    let err = Als::new(&mut tt, &wrong_order, &values.view()).err();
    assert!(matches!(err, Some(AlsError::ShapeMismatch(_))));
    assert!(unchanged(&tt));

    let err = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .config(AlsConfig::default().with_max_sweeps(0))
        .build()
        .err();
    assert!(matches!(err, Some(AlsError::InvalidConfig(_))));
    assert!(unchanged(&tt));

    let err = Als::builder(&mut tt, &meas).build().err();
    assert!(matches!(err, Some(AlsError::InvalidArgument(_))));
    assert!(unchanged(&tt));

    let (_, derivatives) = legendre_measures_with_derivatives(&points.view(), 1, -1.0, 1.0)?;
    let too_many = Array2::zeros((10, 4));
    let err = Als::builder(&mut tt, &meas)
        .values(&values.view())
        .gradients(&derivatives, &too_many.view())
        .build()
        .err();
    assert!(matches!(err, Some(AlsError::InvalidGradients(_))));
    assert!(unchanged(&tt));
    Ok(())
}

#[test]
fn directions_parse_from_text() {
    assert_eq!("left".parse::<Direction>().ok(), Some(Direction::Left));
    assert_eq!("Right".parse::<Direction>().ok(), Some(Direction::Right));
    assert!("up".parse::<Direction>().is_err());
}
