//! Error types for core domain operations.
//!
//! Covers DSN parsing, input validation, and failures raised by packet
//! preparation hooks before an event reaches the transport.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for domain operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The DSN could not be parsed into an endpoint descriptor.
    #[error("invalid DSN: {0}")]
    InvalidDsn(String),

    /// Invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A preparation hook refused or failed to finalize a packet.
    #[error("packet preparation failed: {0}")]
    Preparation(String),
}

impl CoreError {
    /// Creates an invalid DSN error.
    pub fn invalid_dsn(message: impl Into<String>) -> Self {
        Self::InvalidDsn(message.into())
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a preparation error.
    pub fn preparation(message: impl Into<String>) -> Self {
        Self::Preparation(message.into())
    }
}
