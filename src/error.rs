//! Error types for the Healthwear relay
//!
//! Decoding and dispatch never fail: invalid or unrecognized reports are
//! dropped. These errors only cover the boundary (event JSON, configuration,
//! I/O in the CLI and FFI layers).

use thiserror::Error;

/// Errors that can occur at the relay boundary
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to parse raw event: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
