//! Subscriber setup for the `tracing` events emitted during fits
//!
//! The engine logs sweep progress with `tracing` (see
//! [`TracingObserver`](crate::als::TracingObserver)); nothing is printed
//! until a subscriber is installed. Applications call [`init_tracing`] once
//! at startup.
//!
//! # Example
//!
//! ```no_run
//! use bstt::tracing_support::{init_tracing, TracingConfig, TracingFormat};
//!
//! init_tracing(TracingConfig {
//!     format: TracingFormat::Compact,
//!     filter: "bstt_als=debug,warn".to_string(),
//!     ..TracingConfig::default()
//! })?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! # Environment Variables
//!
//! Read by [`TracingConfig::from_env`]:
//!
//! - `RUST_LOG`: filter directive (default `bstt_als=info,bstt=info,warn`)
//! - `BSTT_LOG_FORMAT`: `pretty`, `json` or `compact` (default `pretty`)

use crate::als::SweepReport;
use anyhow::Result;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "bstt_als=info,bstt=info,warn";

/// Tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Multi-line human-readable output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
    /// One line per event
    Compact,
}

impl TracingFormat {
    /// Parse a format name; unknown names fall back to `Pretty`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => TracingFormat::Json,
            "compact" => TracingFormat::Compact,
            _ => TracingFormat::Pretty,
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Output format
    pub format: TracingFormat,
    /// Filter directive (e.g. `"bstt_als=debug,info"`)
    pub filter: String,
    /// Enable ANSI colors
    pub with_ansi: bool,
    /// Show target module paths
    pub with_target: bool,
    /// Show thread IDs
    pub with_thread_ids: bool,
    /// Show file locations and line numbers
    pub with_file: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Pretty,
            filter: DEFAULT_FILTER.to_string(),
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_file: false,
        }
    }
}

impl TracingConfig {
    /// Defaults overridden by `BSTT_LOG_FORMAT` and `RUST_LOG`.
    pub fn from_env() -> Self {
        let format = std::env::var("BSTT_LOG_FORMAT")
            .map(|s| TracingFormat::parse(&s))
            .unwrap_or_default();
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());

        Self {
            format,
            filter,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}

/// Install a global subscriber built from `config`.
///
/// Fails on an invalid filter directive or when a global subscriber is
/// already set.
#[cfg(feature = "tracing")]
pub fn init_tracing(config: TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)?;

    match config.format {
        TracingFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
                .with_file(config.with_file)
                .with_line_number(config.with_file)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
        }
        TracingFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
                .with_file(config.with_file)
                .with_line_number(config.with_file)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
        }
        TracingFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
                .with_file(config.with_file)
                .with_line_number(config.with_file)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
        }
    }

    Ok(())
}

/// Stub for when the `tracing` feature is disabled
#[cfg(not(feature = "tracing"))]
pub fn init_tracing(_config: TracingConfig) -> Result<()> {
    Ok(())
}

/// Record a scalar outcome such as a test error.
#[cfg(feature = "tracing")]
pub fn record_metric(name: &str, value: f64) {
    tracing::info!(metric = name, value = value, "metric_recorded");
}

/// Stub for when the `tracing` feature is disabled
#[cfg(not(feature = "tracing"))]
pub fn record_metric(_name: &str, _value: f64) {}

/// Record how an ALS run ended.
#[cfg(feature = "tracing")]
pub fn record_report(label: &str, report: &SweepReport, elapsed_ms: f64) {
    tracing::info!(
        label = label,
        sweeps = report.sweeps,
        initial_residual = report.initial_residual,
        final_residual = report.final_residual,
        termination = ?report.termination,
        elapsed_ms = elapsed_ms,
        "fit_finished"
    );
}

/// Stub for when the `tracing` feature is disabled
#[cfg(not(feature = "tracing"))]
pub fn record_report(_label: &str, _report: &SweepReport, _elapsed_ms: f64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!(TracingFormat::parse("json"), TracingFormat::Json);
        assert_eq!(TracingFormat::parse(" Compact "), TracingFormat::Compact);
        assert_eq!(TracingFormat::parse("pretty"), TracingFormat::Pretty);
        assert_eq!(TracingFormat::parse("unknown"), TracingFormat::Pretty);
    }

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.format, TracingFormat::Pretty);
        assert_eq!(config.filter, DEFAULT_FILTER);
        assert!(config.with_target);
        assert!(!config.with_thread_ids);
    }

    #[test]
    fn test_recording_without_subscriber() {
        let report = SweepReport {
            sweeps: 2,
            initial_residual: 1.0,
            final_residual: 0.5,
            termination: crate::als::Termination::Stalled,
        };
        record_report("fit", &report, 1.5);
        record_metric("test_error", 0.25);
    }

    #[test]
    fn test_builders() {
        let config = TracingConfig::default()
            .with_format(TracingFormat::Json)
            .with_filter("bstt_als=trace");
        assert_eq!(config.format, TracingFormat::Json);
        assert_eq!(config.filter, "bstt_als=trace");
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = TracingConfig::default().with_filter("bstt_als=notalevel");
        assert!(init_tracing(config).is_err());
    }
}
