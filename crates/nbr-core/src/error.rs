//! Error types for node-breaker model operations.

use thiserror::Error;

/// Unified error type for model construction and lookup.
#[derive(Error, Debug)]
pub enum NbrError {
    /// IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Model errors (dangling references, duplicate attachments)
    #[error("Model error: {0}")]
    Model(String),

    /// Validation errors (structural rules violated)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for NbrError {
    fn from(err: anyhow::Error) -> Self {
        NbrError::Other(err.to_string())
    }
}

impl From<String> for NbrError {
    fn from(msg: String) -> Self {
        NbrError::Other(msg)
    }
}

impl From<&str> for NbrError {
    fn from(msg: &str) -> Self {
        NbrError::Other(msg.to_string())
    }
}

/// Result type alias for model operations.
pub type NbrResult<T> = Result<T, NbrError>;
