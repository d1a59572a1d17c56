//! Outcome of an ALS run.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why [`Als::run`](crate::Als::run) stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Termination {
    /// The residual fell below the target.
    Converged,
    /// The residual increased over the previous sweep. The train keeps the
    /// state of the last sweep.
    Diverged,
    /// The residual decreased by less than the minimal relative decrease.
    Stalled,
    /// The sweep budget was used up.
    MaxSweeps,
}

impl Termination {
    pub fn is_converged(self) -> bool {
        self == Termination::Converged
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Termination::Converged => "target residual reached",
            Termination::Diverged => "residual increases",
            Termination::Stalled => "minimal decrease reached",
            Termination::MaxSweeps => "maximal number of sweeps reached",
        };
        f.write_str(reason)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SweepReport {
    /// Completed sweeps.
    pub sweeps: usize,
    pub initial_residual: f64,
    pub final_residual: f64,
    pub termination: Termination,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} sweeps (residual {:.2e} -> {:.2e})",
            self.termination, self.sweeps, self.initial_residual, self.final_residual
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let report = SweepReport {
            sweeps: 3,
            initial_residual: 1.0,
            final_residual: 2.5e-9,
            termination: Termination::Converged,
        };
        assert_eq!(
            report.to_string(),
            "target residual reached after 3 sweeps (residual 1.00e0 -> 2.50e-9)"
        );
        assert!(report.termination.is_converged());
        assert!(!Termination::Stalled.is_converged());
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_report_serialization() {
        let report = SweepReport {
            sweeps: 5,
            initial_residual: 0.5,
            final_residual: 1e-3,
            termination: Termination::Stalled,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"Stalled\""));

        let deserialized: SweepReport = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, report);
    }
}
