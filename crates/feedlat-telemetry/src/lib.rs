//! Prometheus metrics and structured logging for feedlat.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus metrics for frames, skips, events and arrival delays
//! - Per-run, per-publisher delay percentiles from bucketed histograms

pub mod delay_stats;
pub mod error;
pub mod logging;
pub mod metrics;

pub use delay_stats::{DelayStatsReporter, PublisherDelayStats};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
