//! Error types for the Relay core.
//!
//! Dispatch-level errors (acknowledgment, handler failures) live in
//! `relay-framework`; this module only covers what the core itself can fail at.

use thiserror::Error;

use crate::envelope::Category;

// =============================================================================
// Envelope Errors
// =============================================================================

/// Errors raised while normalizing a raw payload into an
/// [`EventEnvelope`](crate::EventEnvelope).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The payload lacks a field its category cannot do without.
    #[error("malformed {category} envelope: missing required field '{field}'")]
    Malformed {
        /// Category the payload was classified as.
        category: Category,
        /// The missing field.
        field: &'static str,
    },

    /// The payload is not a key/value object.
    #[error("malformed {category} envelope: payload is not an object")]
    NotAnObject {
        /// Category the payload was classified as.
        category: Category,
    },
}

// =============================================================================
// Remote Errors
// =============================================================================

/// Errors returned by [`RemoteClient`](crate::RemoteClient) calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The envelope carries no channel to reply into.
    #[error("envelope has no channel to reply to")]
    NoReplyChannel,

    /// The platform rejected the call.
    #[error("remote call '{method}' failed: {reason}")]
    Api {
        /// API method name, e.g. `chat.postMessage`.
        method: String,
        /// Error reported by the platform.
        reason: String,
    },

    /// No connection to the platform.
    #[error("not connected to the remote platform")]
    NotConnected,

    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Creates an API error for the given method.
    pub fn api(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Api {
            method: method.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for envelope construction.
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;

/// Result type for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;
