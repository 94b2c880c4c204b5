//! Send faults and the handler that absorbs them.
//!
//! Every failure inside a send (preparation, serialization, network,
//! timeout, unexpected response) is captured as a `SendFault`. The
//! transmitter hands it to the configured `FaultHandler` exactly once and
//! then reports the send as failed; the fault itself never reaches the
//! caller of `send`.

use std::{fmt, time::Duration};

use thiserror::Error;

/// Failure that occurred while sending one event.
#[derive(Debug, Clone, Error)]
pub enum SendFault {
    /// The preparation hook refused or failed to finalize the packet.
    #[error("packet preparation failed: {message}")]
    Preparation {
        /// Error message from the preparer.
        message: String,
    },

    /// The packet could not be rendered as JSON.
    #[error("packet serialization failed: {message}")]
    Serialization {
        /// Serializer error message.
        message: String,
    },

    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    Network {
        /// Error message describing the network failure.
        message: String,
    },

    /// The configured timeout elapsed before the exchange completed.
    #[error("request timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout that was exceeded, in milliseconds.
        timeout_ms: u64,
    },

    /// The endpoint answered with a non-success status.
    #[error("event rejected: HTTP {status_code}{}", reason_suffix(.reason))]
    Rejected {
        /// HTTP status code.
        status_code: u16,
        /// Reason reported by the endpoint, when present.
        reason: Option<String>,
    },

    /// The response body was non-empty but not a usable acknowledgement.
    #[error("malformed response: {message}")]
    Protocol {
        /// What was wrong with the response.
        message: String,
    },
}

impl SendFault {
    /// Creates a preparation fault.
    pub fn preparation(message: impl Into<String>) -> Self {
        Self::Preparation { message: message.into() }
    }

    /// Creates a serialization fault.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }

    /// Creates a network fault.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout fault.
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX) }
    }

    /// Creates a rejection fault.
    pub fn rejected(status_code: u16, reason: Option<String>) -> Self {
        Self::Rejected { status_code, reason }
    }

    /// Creates a protocol fault.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol { message: message.into() }
    }

    /// Classifies a transport-level error from the HTTP client.
    pub fn from_http(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::timeout(timeout)
        } else if error.is_connect() {
            Self::network(format!("connection failed: {error}"))
        } else {
            Self::network(error.to_string())
        }
    }

    /// Returns the category of this fault.
    pub fn kind(&self) -> FaultKind {
        FaultKind::from(self)
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default()
}

/// Category of send fault for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Preparation hook failure.
    Preparation,
    /// JSON rendering failure.
    Serialization,
    /// Connection, DNS, TLS or timeout failure.
    Transport,
    /// Unexpected status or body from the endpoint.
    Protocol,
}

impl From<&SendFault> for FaultKind {
    fn from(fault: &SendFault) -> Self {
        match fault {
            SendFault::Preparation { .. } => Self::Preparation,
            SendFault::Serialization { .. } => Self::Serialization,
            SendFault::Network { .. } | SendFault::Timeout { .. } => Self::Transport,
            SendFault::Rejected { .. } | SendFault::Protocol { .. } => Self::Protocol,
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preparation => write!(f, "preparation"),
            Self::Serialization => write!(f, "serialization"),
            Self::Transport => write!(f, "transport"),
            Self::Protocol => write!(f, "protocol"),
        }
    }
}

/// Observer of failed sends.
///
/// Called exactly once for every send that fails. An acknowledgement
/// without content is not a failure and does not reach the handler.
/// The send still reports failure afterwards; a handler can add
/// diagnostics but cannot turn a failure into a success.
pub trait FaultHandler: Send + Sync {
    /// Handles the fault of one failed send.
    fn on_fault(&self, fault: &SendFault);
}

impl<F> FaultHandler for F
where
    F: Fn(&SendFault) + Send + Sync,
{
    fn on_fault(&self, fault: &SendFault) {
        self(fault);
    }
}

/// Logs faults at `warn` level. This is the default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingFaultHandler;

impl FaultHandler for LoggingFaultHandler {
    fn on_fault(&self, fault: &SendFault) {
        tracing::warn!(kind = %fault.kind(), error = %fault, "Event could not be delivered");
    }
}

/// Discards faults.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentFaultHandler;

impl FaultHandler for SilentFaultHandler {
    fn on_fault(&self, _fault: &SendFault) {}
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn fault_kinds_mapped_correctly() {
        assert_eq!(SendFault::preparation("x").kind(), FaultKind::Preparation);
        assert_eq!(SendFault::serialization("x").kind(), FaultKind::Serialization);
        assert_eq!(SendFault::network("refused").kind(), FaultKind::Transport);
        assert_eq!(SendFault::timeout(Duration::from_secs(1)).kind(), FaultKind::Transport);
        assert_eq!(SendFault::rejected(429, None).kind(), FaultKind::Protocol);
        assert_eq!(SendFault::protocol("bad json").kind(), FaultKind::Protocol);
    }

    #[test]
    fn fault_display_format() {
        assert_eq!(
            SendFault::timeout(Duration::from_millis(250)).to_string(),
            "request timeout after 250ms"
        );
        assert_eq!(SendFault::rejected(403, None).to_string(), "event rejected: HTTP 403");
        assert_eq!(
            SendFault::rejected(429, Some("quota exceeded".into())).to_string(),
            "event rejected: HTTP 429 (quota exceeded)"
        );
    }

    #[test]
    fn closures_act_as_fault_handlers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = move |_: &SendFault| {
            counter.fetch_add(1, Ordering::SeqCst);
        };

        handler.on_fault(&SendFault::network("down"));
        LoggingFaultHandler.on_fault(&SendFault::network("down"));
        SilentFaultHandler.on_fault(&SendFault::network("down"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
