//! Progress reporting for ALS engines.
//!
//! The engine calls an [`AlsObserver`] at every structural step. The
//! default [`TracingObserver`] turns these calls into `tracing` events;
//! [`RecordingObserver`] keeps them for later inspection.
//!
//! Residuals around single moves and microsteps cost one extra residual
//! evaluation each, so the engine only computes them when
//! [`AlsObserver::wants_step_residuals`] says so.

use crate::report::{SweepReport, Termination};

/// Engine state once construction has finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitializedEvent {
    pub order: usize,
    pub num_samples: usize,
    pub num_channels: usize,
    pub dofs: usize,
}

/// One step of the core position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveEvent {
    pub from: usize,
    pub to: usize,
    /// Residual before and after the move, when requested.
    pub residuals: Option<(f64, f64)>,
}

/// One local solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MicrostepEvent {
    pub position: usize,
    /// Free coefficients of the solved core.
    pub dofs: usize,
    /// Residual before and after the solve, when requested.
    pub residuals: Option<(f64, f64)>,
}

/// One completed sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepEvent {
    /// Zero-based sweep index.
    pub sweep: usize,
    pub residual: f64,
    /// Gramian-weighted norm of the represented function.
    pub gramian_norm: f64,
}

/// Hooks invoked by [`Als`](crate::Als). Every method defaults to a no-op.
pub trait AlsObserver {
    /// Whether the engine should evaluate the residual before and after each
    /// move and microstep.
    fn wants_step_residuals(&self) -> bool {
        false
    }

    fn on_initialized(&mut self, _event: &InitializedEvent) {}

    fn on_move(&mut self, _event: &MoveEvent) {}

    fn on_microstep(&mut self, _event: &MicrostepEvent) {}

    fn on_sweep(&mut self, _event: &SweepEvent) {}

    fn on_terminated(&mut self, _report: &SweepReport) {}
}

impl<O: AlsObserver + ?Sized> AlsObserver for &mut O {
    fn wants_step_residuals(&self) -> bool {
        (**self).wants_step_residuals()
    }

    fn on_initialized(&mut self, event: &InitializedEvent) {
        (**self).on_initialized(event)
    }

    fn on_move(&mut self, event: &MoveEvent) {
        (**self).on_move(event)
    }

    fn on_microstep(&mut self, event: &MicrostepEvent) {
        (**self).on_microstep(event)
    }

    fn on_sweep(&mut self, event: &SweepEvent) {
        (**self).on_sweep(event)
    }

    fn on_terminated(&mut self, report: &SweepReport) {
        (**self).on_terminated(report)
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AlsObserver for NoopObserver {}

/// Emits `tracing` events.
///
/// - verbosity 0: only a warning when a run stops on an increasing residual
/// - verbosity ≥ 1: `info!` per sweep and at termination
/// - verbosity ≥ 2: `debug!` per move and microstep with residuals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracingObserver {
    pub verbosity: u8,
}

impl TracingObserver {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }
}

impl AlsObserver for TracingObserver {
    fn wants_step_residuals(&self) -> bool {
        self.verbosity >= 2
    }

    fn on_initialized(&mut self, event: &InitializedEvent) {
        if self.verbosity >= 1 {
            tracing::info!(
                order = event.order,
                num_samples = event.num_samples,
                num_channels = event.num_channels,
                dofs = event.dofs,
                "als initialized"
            );
        }
    }

    fn on_move(&mut self, event: &MoveEvent) {
        if self.verbosity < 2 {
            return;
        }
        match event.residuals {
            Some((before, after)) => tracing::debug!(
                from = event.from,
                to = event.to,
                "move_core {} --> {}. (residual: {:.2e} --> {:.2e})",
                event.from,
                event.to,
                before,
                after
            ),
            None => tracing::debug!(
                from = event.from,
                to = event.to,
                "move_core {} --> {}.",
                event.from,
                event.to
            ),
        }
    }

    fn on_microstep(&mut self, event: &MicrostepEvent) {
        if self.verbosity < 2 {
            return;
        }
        if let Some((before, after)) = event.residuals {
            tracing::debug!(
                position = event.position,
                dofs = event.dofs,
                "microstep. (residual: {:.2e} --> {:.2e})",
                before,
                after
            );
        }
    }

    fn on_sweep(&mut self, event: &SweepEvent) {
        if self.verbosity >= 1 {
            tracing::info!(
                sweep = event.sweep,
                gramian_norm = event.gramian_norm,
                "[{}] residual: {:.2e}",
                event.sweep,
                event.residual
            );
        }
    }

    fn on_terminated(&mut self, report: &SweepReport) {
        if report.termination == Termination::Diverged {
            tracing::warn!(
                sweeps = report.sweeps,
                final_residual = report.final_residual,
                "als stopped on an increasing residual; keeping the last sweep"
            );
        }
        if self.verbosity >= 1 {
            tracing::info!(
                sweeps = report.sweeps,
                initial_residual = report.initial_residual,
                "terminating ({}), final residual: {:.2e}",
                report.termination,
                report.final_residual
            );
        }
    }
}

/// Everything an [`AlsObserver`] can be told, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum AlsEvent {
    Initialized(InitializedEvent),
    Move(MoveEvent),
    Microstep(MicrostepEvent),
    Sweep(SweepEvent),
    Terminated(SweepReport),
}

/// Stores every event.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    /// Request residuals around moves and microsteps.
    pub step_residuals: bool,
    pub events: Vec<AlsEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_residuals() -> Self {
        Self {
            step_residuals: true,
            events: Vec::new(),
        }
    }

    pub fn moves(&self) -> impl Iterator<Item = &MoveEvent> {
        self.events.iter().filter_map(|event| match event {
            AlsEvent::Move(e) => Some(e),
            _ => None,
        })
    }

    pub fn microsteps(&self) -> impl Iterator<Item = &MicrostepEvent> {
        self.events.iter().filter_map(|event| match event {
            AlsEvent::Microstep(e) => Some(e),
            _ => None,
        })
    }

    /// Residual after each sweep.
    pub fn sweep_residuals(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter_map(|event| match event {
                AlsEvent::Sweep(e) => Some(e.residual),
                _ => None,
            })
            .collect()
    }

    pub fn termination(&self) -> Option<&SweepReport> {
        self.events.iter().rev().find_map(|event| match event {
            AlsEvent::Terminated(report) => Some(report),
            _ => None,
        })
    }
}

impl AlsObserver for RecordingObserver {
    fn wants_step_residuals(&self) -> bool {
        self.step_residuals
    }

    fn on_initialized(&mut self, event: &InitializedEvent) {
        self.events.push(AlsEvent::Initialized(*event));
    }

    fn on_move(&mut self, event: &MoveEvent) {
        self.events.push(AlsEvent::Move(*event));
    }

    fn on_microstep(&mut self, event: &MicrostepEvent) {
        self.events.push(AlsEvent::Microstep(*event));
    }

    fn on_sweep(&mut self, event: &SweepEvent) {
        self.events.push(AlsEvent::Sweep(*event));
    }

    fn on_terminated(&mut self, report: &SweepReport) {
        self.events.push(AlsEvent::Terminated(report.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let mut observer = RecordingObserver::new();
        observer.on_move(&MoveEvent {
            from: 1,
            to: 0,
            residuals: None,
        });
        observer.on_sweep(&SweepEvent {
            sweep: 0,
            residual: 0.5,
            gramian_norm: 1.0,
        });
        observer.on_sweep(&SweepEvent {
            sweep: 1,
            residual: 0.25,
            gramian_norm: 1.0,
        });
        assert_eq!(observer.moves().count(), 1);
        assert_eq!(observer.sweep_residuals(), vec![0.5, 0.25]);
        assert!(observer.termination().is_none());
    }

    #[test]
    fn test_step_residuals_follow_verbosity() {
        assert!(!TracingObserver::new(1).wants_step_residuals());
        assert!(TracingObserver::new(2).wants_step_residuals());
        assert!(RecordingObserver::with_step_residuals().wants_step_residuals());
    }

    #[test]
    fn test_borrowed_observer_forwards() {
        fn notify<O: AlsObserver>(mut observer: O) {
            observer.on_microstep(&MicrostepEvent {
                position: 0,
                dofs: 3,
                residuals: None,
            });
        }

        let mut inner = RecordingObserver::new();
        notify(&mut inner);
        assert_eq!(inner.microsteps().count(), 1);
    }
}
