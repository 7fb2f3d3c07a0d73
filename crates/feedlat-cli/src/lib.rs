//! feedlat: latency analysis for redundant market data feeds.
//!
//! Wires the pipeline together:
//! - capture file to frame stream
//! - correlation (streaming or partitioned)
//! - aggregation, coverage and reporting
//! - metrics and result files

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::{Application, RunOutcome};
pub use cli::Args;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
