//! Stopping rules for sweeps and multilevel fits.

use crate::error::{AlsError, AlsResult};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stopping rules of [`Als::run`](crate::Als::run).
///
/// After every sweep the run stops when the relative residual drops below
/// `target_residual`, when it increases, when it decreased by less than
/// `min_decrease` times its current value, or after `max_sweeps` sweeps.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlsConfig {
    pub max_sweeps: usize,
    pub target_residual: f64,
    pub min_decrease: f64,
}

impl Default for AlsConfig {
    fn default() -> Self {
        Self {
            max_sweeps: 100,
            target_residual: 1e-8,
            min_decrease: 1e-4,
        }
    }
}

impl AlsConfig {
    pub fn with_max_sweeps(self, max_sweeps: usize) -> Self {
        Self { max_sweeps, ..self }
    }

    pub fn with_target_residual(self, target_residual: f64) -> Self {
        Self {
            target_residual,
            ..self
        }
    }

    pub fn with_min_decrease(self, min_decrease: f64) -> Self {
        Self {
            min_decrease,
            ..self
        }
    }

    pub fn validate(&self) -> AlsResult<()> {
        if self.max_sweeps == 0 {
            return Err(AlsError::InvalidConfig(
                "max_sweeps must be at least 1".to_string(),
            ));
        }
        check_non_negative("target_residual", self.target_residual)?;
        check_non_negative("min_decrease", self.min_decrease)
    }
}

fn check_non_negative(name: &str, value: f64) -> AlsResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AlsError::InvalidConfig(format!(
            "{} must be finite and non-negative, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Settings of [`fit_multilevel`](crate::fit_multilevel).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultilevelConfig {
    /// Passes over all levels.
    pub max_iterations: usize,
    /// Stop once the joint relative residual is below this.
    pub target_residual: f64,
    /// Norm of core 0 of every level before the first pass.
    pub initial_core_norm: f64,
    /// Stopping rules of the per-level ALS runs.
    pub als: AlsConfig,
}

impl Default for MultilevelConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            target_residual: 1e-12,
            initial_core_norm: 1e-3,
            als: AlsConfig::default().with_target_residual(1e-12),
        }
    }
}

impl MultilevelConfig {
    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// Set the joint target and the per-level ALS target together.
    pub fn with_target_residual(self, target_residual: f64) -> Self {
        Self {
            target_residual,
            als: self.als.with_target_residual(target_residual),
            ..self
        }
    }

    pub fn with_initial_core_norm(self, initial_core_norm: f64) -> Self {
        Self {
            initial_core_norm,
            ..self
        }
    }

    pub fn with_als(self, als: AlsConfig) -> Self {
        Self { als, ..self }
    }

    pub fn validate(&self) -> AlsResult<()> {
        if self.max_iterations == 0 {
            return Err(AlsError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        check_non_negative("target_residual", self.target_residual)?;
        check_non_negative("initial_core_norm", self.initial_core_norm)?;
        self.als.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AlsConfig::default();
        assert_eq!(config.max_sweeps, 100);
        assert_eq!(config.target_residual, 1e-8);
        assert_eq!(config.min_decrease, 1e-4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = AlsConfig::default()
            .with_max_sweeps(7)
            .with_min_decrease(0.0);
        assert_eq!(config.max_sweeps, 7);
        assert_eq!(config.min_decrease, 0.0);
        assert_eq!(config.target_residual, 1e-8);
    }

    #[test]
    fn test_invalid_values() {
        assert!(AlsConfig::default().with_max_sweeps(0).validate().is_err());
        assert!(AlsConfig::default()
            .with_target_residual(f64::NAN)
            .validate()
            .is_err());
        assert!(matches!(
            AlsConfig::default().with_min_decrease(-1.0).validate(),
            Err(AlsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_multilevel_target_propagates() {
        let config = MultilevelConfig::default().with_target_residual(1e-6);
        assert_eq!(config.als.target_residual, 1e-6);
        assert!(config.validate().is_ok());
        assert!(config.with_max_iterations(0).validate().is_err());
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_config_serialization() {
        let config = MultilevelConfig::default()
            .with_max_iterations(4)
            .with_als(AlsConfig::default().with_max_sweeps(12));

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("max_sweeps"));
        assert!(json.contains("initial_core_norm"));

        let deserialized: MultilevelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, config);
        assert!(deserialized.validate().is_ok());
    }
}
