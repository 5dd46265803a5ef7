//! Error types for the DDNS agent
//!
//! This module defines the error taxonomy shared by the resolver, the
//! publisher and the scheduler.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS agent
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure reaching either endpoint
    #[error("Network error: {0}")]
    Network(String),

    /// The IP lookup response did not contain a valid IPv4 address
    #[error("Parse error: {reason}. Server response was: {body}")]
    Parse {
        /// What was wrong with the response
        reason: String,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// The update endpoint returned an unknown status or a non-success HTTP code
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The provider recognized the request but refused it
    #[error("Update rejected: {0}")]
    Rejected(String),

    /// The provider reported a technical failure on its side
    #[error("Transient provider failure: {0}")]
    TransientFailure(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not valid in the scheduler's current state
    #[error("Invalid scheduler state: {0}")]
    InvalidState(String),

    /// Local I/O errors (config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a parse error carrying the raw response body
    pub fn parse(reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a rejection error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Create a transient provider failure
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientFailure(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Whether the next scheduled attempt is likely to succeed without
    /// operator action
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::TransientFailure(_))
    }
}
