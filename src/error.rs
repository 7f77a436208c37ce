//! Error types for the Keygate service.

use thiserror::Error;

/// Main error type for Keygate operations.
#[derive(Error, Debug)]
pub enum KeygateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Keygate operations.
pub type Result<T> = std::result::Result<T, KeygateError>;
