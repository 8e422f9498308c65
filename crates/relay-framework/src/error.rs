//! Error types for the Relay framework.

use std::time::Duration;

use thiserror::Error;

use relay_core::{Category, EnvelopeError};

/// Errors returned by [`HandlerContext::acknowledge`](crate::HandlerContext::acknowledge).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AckError {
    /// The context was already acknowledged once.
    #[error("action already acknowledged")]
    AlreadyAcknowledged,

    /// Only action envelopes take an acknowledgment.
    #[error("{category} envelopes do not take an acknowledgment")]
    NotRequired {
        /// Category of the envelope being handled.
        category: Category,
    },
}

/// Problems recorded while dispatching one envelope.
///
/// None of these stop a dispatch: they are collected into the
/// [`DispatchReport`](crate::DispatchReport) and logged.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The payload could not be turned into an envelope; no handler ran.
    #[error(transparent)]
    MalformedEnvelope(#[from] EnvelopeError),

    /// A handler returned an error or panicked.
    #[error("handler '{handler}' failed: {reason}")]
    HandlerFailure {
        /// Label of the failing binding.
        handler: String,
        /// Rendered error or panic message.
        reason: String,
    },

    /// An action handler did not acknowledge in time.
    #[error("handler '{handler}' did not acknowledge within {timeout:?}")]
    AcknowledgmentTimeout {
        /// Label of the binding.
        handler: String,
        /// The deadline that was missed.
        timeout: Duration,
    },
}

impl DispatchError {
    /// Returns `true` for [`DispatchError::HandlerFailure`].
    pub fn is_handler_failure(&self) -> bool {
        matches!(self, Self::HandlerFailure { .. })
    }

    /// Returns `true` for [`DispatchError::AcknowledgmentTimeout`].
    pub fn is_ack_timeout(&self) -> bool {
        matches!(self, Self::AcknowledgmentTimeout { .. })
    }
}

/// Result type for acknowledgment.
pub type AckResult = Result<(), AckError>;
