//! Capture error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("\"{0}\" does not exist")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported capture: {0}")]
    Unsupported(String),

    #[error("Corrupt capture: {0}")]
    Corrupt(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CaptureResult<T> = Result<T, CaptureError>;
