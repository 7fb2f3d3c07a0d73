//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capture error: {0}")]
    Capture(#[from] feedlat_capture::CaptureError),

    #[error("Invalid argument: {0}")]
    Core(#[from] feedlat_core::CoreError),

    #[error("Report error: {0}")]
    Report(#[from] feedlat_report::ReportError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] feedlat_telemetry::TelemetryError),
}

pub type AppResult<T> = Result<T, AppError>;
