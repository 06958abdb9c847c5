//! Error types for the reink-cable client.

use std::fmt;

use thiserror::Error;

/// Why the cable is unavailable right now.
///
/// Unavailability is a normal, retryable condition rather than a fault:
/// callers typically skip the live feature and try again on the next user
/// interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The client was built for a non-client execution context
    /// (e.g. server-side rendering) and never opens connections.
    Disabled,
    /// No authenticated identity is currently present.
    NoIdentity,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::Disabled => write!(f, "client is disabled in this context"),
            UnavailableReason::NoIdentity => write!(f, "no authenticated identity"),
        }
    }
}

/// Error type for all reink-cable operations.
#[derive(Error, Debug)]
pub enum CableError {
    /// The cable is unavailable in the current state. Retryable.
    #[error("Cable unavailable: {0}")]
    Unavailable(UnavailableReason),

    /// Invalid client configuration (bad endpoint, missing builder field).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// WebSocket connection or command-channel failure.
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// A bounded wait elapsed (connect, welcome handshake).
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CableError {
    /// Returns `true` for the retryable "feature unavailable right now" case.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CableError::Unavailable(_))
    }
}

impl From<serde_json::Error> for CableError {
    fn from(err: serde_json::Error) -> Self {
        CableError::SerializationError(err.to_string())
    }
}

/// Result type alias for reink-cable operations.
pub type Result<T> = std::result::Result<T, CableError>;
