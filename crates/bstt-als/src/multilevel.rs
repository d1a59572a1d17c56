//! Fitting a sum of tensor trains by block coordinate descent.
//!
//! A function is modelled as `f = f_0 + f_1 + … + f_m`, typically with
//! `f_j` a homogeneous polynomial of degree `j`. Each pass refits every
//! level with ALS against the targets minus all other levels.

use crate::config::MultilevelConfig;
use crate::engine::Als;
use crate::error::{AlsError, AlsResult};
use crate::report::SweepReport;
use bstt_core::{BlockSparseTT, Measurements};
use scirs2_core::ndarray_ext::{Array1, ArrayView1};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of [`fit_multilevel`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultilevelReport {
    /// Completed passes over all levels.
    pub iterations: usize,
    /// Joint relative residual after each pass.
    pub residuals: Vec<f64>,
    /// ALS report of every level in the last pass.
    pub level_reports: Vec<SweepReport>,
}

impl MultilevelReport {
    pub fn final_residual(&self) -> f64 {
        self.residuals.last().copied().unwrap_or(f64::INFINITY)
    }
}

fn relative_error(prediction: &Array1<f64>, values: &ArrayView1<f64>, values_norm: f64) -> f64 {
    let error = (prediction - values).mapv(|v| v * v).sum().sqrt();
    if values_norm > 0.0 {
        error / values_norm
    } else {
        error
    }
}

/// Fit `trains` so that their sum matches `values`.
///
/// Every train is orthogonalized towards core 0 and rescaled so that core 0
/// has norm `initial_core_norm`. Then each pass fits the levels in order.
/// The fit stops after a pass whose joint residual is below the target or
/// larger than the one before; the trains keep the state of that pass.
pub fn fit_multilevel(
    trains: &mut [BlockSparseTT],
    measurements: &Measurements,
    values: &ArrayView1<f64>,
    config: &MultilevelConfig,
) -> AlsResult<MultilevelReport> {
    config.validate()?;
    if trains.is_empty() {
        return Err(AlsError::InvalidArgument(
            "multilevel fit needs at least one train".to_string(),
        ));
    }
    if values.len() != measurements.num_samples() {
        return Err(AlsError::ShapeMismatch(format!(
            "{} values for {} samples",
            values.len(),
            measurements.num_samples()
        )));
    }
    for (level, tt) in trains.iter().enumerate() {
        if !tt.coupling().is_scalar() {
            return Err(AlsError::InvalidArgument(format!(
                "level {} is not a scalar train",
                level
            )));
        }
        if tt.dimensions() != measurements.dimensions() {
            return Err(AlsError::ShapeMismatch(format!(
                "level {} has dimensions {:?}, measurements have {:?}",
                level,
                tt.dimensions(),
                measurements.dimensions()
            )));
        }
    }

    for tt in trains.iter_mut() {
        tt.canonicalize(0)?;
        let norm = tt.core_norm();
        if norm > 0.0 {
            tt.scale_component(0, config.initial_core_norm / norm)?;
        }
    }

    let mut evaluations = trains
        .iter()
        .map(|tt| tt.evaluate_scalar(measurements))
        .collect::<Result<Vec<_>, _>>()?;
    let values_norm = values.dot(values).sqrt();

    let mut residuals = Vec::new();
    let mut level_reports = Vec::with_capacity(trains.len());
    let mut previous = f64::INFINITY;

    for iteration in 0..config.max_iterations {
        level_reports.clear();
        for level in 0..trains.len() {
            let mut level_values = values.to_owned();
            for (other, evaluation) in evaluations.iter().enumerate() {
                if other != level {
                    level_values -= evaluation;
                }
            }

            let report = {
                let mut als = Als::builder(&mut trains[level], measurements)
                    .values(&level_values.view())
                    .config(config.als)
                    .build()?;
                als.run()?
            };
            tracing::debug!(iteration, level, %report, "level fitted");
            level_reports.push(report);
            evaluations[level] = trains[level].evaluate_scalar(measurements)?;
        }

        let mut prediction = Array1::<f64>::zeros(values.len());
        for evaluation in &evaluations {
            prediction += evaluation;
        }
        let residual = relative_error(&prediction, values, values_norm);
        residuals.push(residual);
        tracing::info!(iteration, residual, "multilevel pass finished");

        if previous < residual || residual < config.target_residual {
            break;
        }
        previous = residual;
    }

    Ok(MultilevelReport {
        iterations: residuals.len(),
        residuals,
        level_reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstt_core::Block;
    use scirs2_core::ndarray_ext::Array2;
    use scirs2_core::random::{rngs::StdRng, SeedableRng};

    fn constant_train() -> BlockSparseTT {
        BlockSparseTT::zeros(&[2], &[], vec![vec![Block::new(0, 0, 0)]]).unwrap()
    }

    #[test]
    fn test_rejects_empty_levels() {
        let meas = Measurements::from_modes(vec![Array2::ones((3, 2))]).unwrap();
        let values = Array1::ones(3);
        let result = fit_multilevel(&mut [], &meas, &values.view(), &MultilevelConfig::default());
        assert!(matches!(result, Err(AlsError::InvalidArgument(_))));
    }

    #[test]
    fn test_rejects_wrong_value_count() {
        let meas = Measurements::from_modes(vec![Array2::ones((3, 2))]).unwrap();
        let values = Array1::ones(4);
        let mut trains = vec![constant_train()];
        let result = fit_multilevel(&mut trains, &meas, &values.view(), &MultilevelConfig::default());
        assert!(matches!(result, Err(AlsError::ShapeMismatch(_))));
    }

    #[test]
    fn test_two_univariate_levels() {
        // f(x) = 2 + 3x as a constant level plus a linear level
        let mut rng = StdRng::seed_from_u64(0);
        let constant =
            BlockSparseTT::random(&[2], &[], vec![vec![Block::new(0, 0, 0)]], &mut rng).unwrap();
        let linear =
            BlockSparseTT::random(&[2], &[], vec![vec![Block::new(0, 1, 0)]], &mut rng).unwrap();
        let mut trains = vec![constant, linear];

        let x: Array1<f64> = Array1::linspace(-1.0, 1.0, 9);
        let mode = Array2::from_shape_fn((9, 2), |(n, e)| x[n].powi(e as i32));
        let meas = Measurements::from_modes(vec![mode]).unwrap();
        let values = x.mapv(|v| 2.0 + 3.0 * v);

        let report =
            fit_multilevel(&mut trains, &meas, &values.view(), &MultilevelConfig::default())
                .unwrap();
        assert!(report.final_residual() < 1e-10);
        assert!(report.iterations <= 2);
    }
}
