//! Error types for the TextData client core
//!
//! This module provides structured error handling using thiserror for
//! error definitions and anyhow for ad-hoc propagation.

use thiserror::Error;

/// Main error type for TextData client operations
#[derive(Error, Debug)]
pub enum TextdataError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Realtime transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Session actor could not be reached or failed
    #[error("Session error: {0}")]
    Session(String),

    /// Invalid operation (e.g., sending on a closed transport)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for TextData operations
pub type Result<T> = std::result::Result<T, TextdataError>;

/// Convert anyhow::Error to TextdataError
impl From<anyhow::Error> for TextdataError {
    fn from(err: anyhow::Error) -> Self {
        TextdataError::Other(err.to_string())
    }
}
