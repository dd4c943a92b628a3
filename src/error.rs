//! Error types for therapy-progress

use crate::schema::ValidationError;
use thiserror::Error;

/// Errors that can occur while parsing input or building reports
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
