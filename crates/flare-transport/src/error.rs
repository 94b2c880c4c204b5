//! Precondition errors raised while constructing transport components.
//!
//! These are programming errors: they surface immediately to the caller
//! building a request and never reach the network. Failures that happen
//! during a send are `SendFault`s instead and never escape `Transmitter::send`.

use thiserror::Error;

/// Result type alias for transport construction.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Construction-time transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Requested content encoding is not gzip or deflate.
    #[error("unsupported content encoding: {encoding}")]
    UnsupportedEncoding {
        /// Encoding name as supplied by the caller.
        encoding: String,
    },

    /// A required input was absent.
    #[error("missing required {what}")]
    MissingInput {
        /// Name of the absent input.
        what: &'static str,
    },

    /// The transport could not be configured.
    #[error("invalid transport configuration: {message}")]
    Configuration {
        /// Configuration error message.
        message: String,
    },
}

impl TransportError {
    /// Creates an unsupported encoding error.
    pub fn unsupported_encoding(encoding: impl Into<String>) -> Self {
        Self::UnsupportedEncoding { encoding: encoding.into() }
    }

    /// Creates a missing input error.
    pub fn missing(what: &'static str) -> Self {
        Self::MissingInput { what }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_format() {
        assert_eq!(
            TransportError::unsupported_encoding("br").to_string(),
            "unsupported content encoding: br"
        );
        assert_eq!(TransportError::missing("body").to_string(), "missing required body");
    }
}
