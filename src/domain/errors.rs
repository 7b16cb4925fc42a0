//! Domain error types
//!
//! This module defines the error hierarchy for Weighbridge. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Weighbridge error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source provider (Withings) errors
    #[error("Withings error: {0}")]
    Source(#[from] SourceError),

    /// Destination provider errors
    #[error("Destination error: {0}")]
    Destination(#[from] DestinationError),

    /// Another batch is already running against the same token store
    #[error("A sync run is already in progress")]
    SyncInProgress,

    /// Persisted state (token store, session directory) errors
    #[error("State management error: {0}")]
    State(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl BridgeError {
    /// Whether the error means a human has to authorize the source account again
    pub fn requires_authorization(&self) -> bool {
        matches!(
            self,
            BridgeError::Source(SourceError::InteractiveLoginRequired { .. })
        )
    }
}

/// Source provider errors
///
/// Errors raised by the Withings OAuth and measurement endpoints. Provider
/// payloads are kept verbatim so a failed run can be diagnosed from the log.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Authorization-code exchange rejected (non-200 or non-zero status)
    #[error("Token exchange failed (HTTP {status}): {payload}")]
    AuthExchange { status: u16, payload: String },

    /// Refresh-token grant rejected
    #[error("Token refresh failed (HTTP {status}): {payload}")]
    AuthRefresh { status: u16, payload: String },

    /// Measurement fetch rejected
    #[error("Measurement fetch failed (HTTP {status}): {payload}")]
    Fetch { status: u16, payload: String },

    /// Transport failure before any response was received
    #[error("Failed to connect to Withings: {0}")]
    ConnectionFailed(String),

    /// Response body could not be decoded
    #[error("Invalid response from Withings: {0}")]
    InvalidResponse(String),

    /// No usable token and no authorization code available
    #[error("Interactive authorization required, visit: {authorize_url}")]
    InteractiveLoginRequired { authorize_url: String },

    /// Pasted callback URL carried a different `state` than the one sent
    #[error("OAuth state mismatch: expected {expected}, got {actual}")]
    StateMismatch { expected: String, actual: String },
}

/// Destination provider errors
///
/// Upload failures are per item; the sync engine counts them instead of
/// aborting the run.
#[derive(Debug, Error)]
pub enum DestinationError {
    /// Login rejected or no credentials configured
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// A single upload was rejected
    #[error("Upload failed: {status} - {message}")]
    UploadFailed { status: u16, message: String },

    /// Transport failure
    #[error("Failed to connect to destination: {0}")]
    ConnectionFailed(String),

    /// Response body could not be decoded
    #[error("Invalid response from destination: {0}")]
    InvalidResponse(String),

    /// Persisted session could not be read or written
    #[error("Session error: {0}")]
    Session(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for BridgeError {
    fn from(err: toml::de::Error) -> Self {
        BridgeError::Configuration(format!("TOML parse error: {err}"))
    }
}
