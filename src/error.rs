//! Error types for telemetry relaying.
//!
//! All errors implement `std::error::Error` and carry enough context to tell
//! an operator what failed and whether retrying makes sense.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: the bridge endpoint is unreachable or dropped
//! - **Send Errors**: a single delivery to a session or endpoint failed
//! - **Timeouts**: connect or send exceeded its I/O budget
//! - **Startup Errors**: binding a listener, loading configuration, acquiring a source
//! - **Codec Errors**: payload encoding or decoding failures
//!
//! Normalization never produces an error: malformed fields degrade to schema
//! defaults. Queue overflow is not an error either; it evicts the oldest item.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use acc_relay::RelayError;
//!
//! let error = RelayError::connection_failed("connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Main error type for relay operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Failed to connect to telemetry endpoint: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to send to {target}: {reason}")]
    Send { target: String, reason: String },

    #[error("{operation} timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },

    #[error("Failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Failed to encode payload")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode payload: {details}")]
    Decode { details: String },

    #[error("Telemetry source error: {reason}")]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::Connection { .. } => true,
            RelayError::Send { .. } => true,
            RelayError::Timeout { .. } => true,
            RelayError::Source { .. } => true,
            RelayError::Io(_) => true,
            RelayError::Bind { .. } => false,
            RelayError::Config { .. } => false,
            RelayError::Encode { .. } => false,
            RelayError::Decode { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            RelayError::Connection { .. } => vec![
                "Ensure the telemetry receiver is running",
                "Check the bridge URL host and port",
                "Verify no firewall blocks the connection",
            ],
            RelayError::Send { .. } => vec![
                "Check that the subscriber is still connected",
                "Expect a gap in telemetry until the link recovers",
            ],
            RelayError::Timeout { .. } => vec![
                "Increase the connect or send timeout",
                "Check network latency to the endpoint",
                "Verify the receiver is not overloaded",
            ],
            RelayError::Bind { .. } => vec![
                "Check that no other process is using the port",
                "Choose a different bind address",
                "Verify permissions for privileged ports",
            ],
            RelayError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Compare values against the documented defaults",
            ],
            RelayError::Encode { .. } => vec![
                "Check snapshot field values are serializable",
                "Report the failing snapshot kind",
            ],
            RelayError::Decode { .. } => vec![
                "Verify the sender produces relay payloads",
                "Check for truncated or corrupted messages",
            ],
            RelayError::Source { .. } => vec![
                "Ensure the simulator is running",
                "Check the source input format",
                "Restart the relay once the source is available",
            ],
            RelayError::Io(_) => vec![
                "Check file and socket permissions",
                "Verify system resources availability",
            ],
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        RelayError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        RelayError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for a failed delivery.
    pub fn send_failed(target: impl Into<String>, reason: impl Into<String>) -> Self {
        RelayError::Send { target: target.into(), reason: reason.into() }
    }

    /// Helper constructor for timeouts.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        RelayError::Timeout { operation: operation.into(), duration }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        RelayError::Config { context: context.into(), details: details.into() }
    }

    /// Helper constructor for decode errors.
    pub fn decode(details: impl Into<String>) -> Self {
        RelayError::Decode { details: details.into() }
    }

    /// Helper constructor for source errors.
    pub fn source_failed(reason: impl Into<String>) -> Self {
        RelayError::Source { reason: reason.into(), source: None }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Encode { source: err }
    }
}
