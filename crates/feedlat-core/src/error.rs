//! Error types for feedlat-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid publisher id: {0}")]
    InvalidPublisher(String),

    #[error("Invalid payload hex: {0}")]
    InvalidPayload(#[from] hex::FromHexError),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
