//! Per-invocation handler context.
//!
//! A [`HandlerContext`] is built fresh for every handler invocation and is
//! never shared between two bindings. It bundles:
//!
//! - the envelope being handled,
//! - the [`RemoteClient`](relay_core::RemoteClient) capability,
//! - a `reply` shortcut bound to the envelope's originating channel,
//! - for action envelopes only, the acknowledgment for this handler.
//!
//! Cloning a context (e.g. to move it into a spawned task) shares the same
//! acknowledgment: a clone acknowledging counts for the original.

use std::sync::Arc;

use serde_json::Value;

use relay_core::{BoxedClient, EventEnvelope, MessageHandle, RemoteError, RemoteResult};

use crate::ack::Acknowledger;
use crate::error::{AckError, AckResult};

/// The capability bundle passed to a handler.
#[derive(Clone)]
pub struct HandlerContext {
    envelope: Arc<EventEnvelope>,
    client: BoxedClient,
    ack: Option<Arc<Acknowledger>>,
}

impl HandlerContext {
    pub(crate) fn new(
        envelope: Arc<EventEnvelope>,
        client: BoxedClient,
        ack: Option<Acknowledger>,
    ) -> Self {
        Self {
            envelope,
            client,
            ack: ack.map(Arc::new),
        }
    }

    /// Returns the envelope being handled.
    pub fn envelope(&self) -> &EventEnvelope {
        &self.envelope
    }

    /// Returns the remote client.
    pub fn client(&self) -> &BoxedClient {
        &self.client
    }

    /// Sends `text` back to the channel the envelope came from.
    ///
    /// # Errors
    ///
    /// [`RemoteError::NoReplyChannel`] if the envelope has no channel,
    /// otherwise whatever the client returns.
    pub async fn reply(&self, text: &str) -> RemoteResult<MessageHandle> {
        self.reply_with_blocks(text, None).await
    }

    /// Like [`reply`](Self::reply), with an opaque block payload.
    pub async fn reply_with_blocks(
        &self,
        text: &str,
        blocks: Option<Value>,
    ) -> RemoteResult<MessageHandle> {
        let channel = self
            .envelope
            .reply_channel()
            .ok_or(RemoteError::NoReplyChannel)?;
        self.client.post_message(channel, text, blocks).await
    }

    /// Acknowledges an action envelope.
    ///
    /// # Errors
    ///
    /// [`AckError::AlreadyAcknowledged`] on every call after the first, and
    /// [`AckError::NotRequired`] if the envelope is not an action.
    pub fn acknowledge(&self) -> AckResult {
        match &self.ack {
            Some(ack) => ack.acknowledge(),
            None => Err(AckError::NotRequired {
                category: self.envelope.category(),
            }),
        }
    }

    /// Returns `true` if this context has been acknowledged.
    pub fn is_acknowledged(&self) -> bool {
        self.ack.as_ref().is_some_and(|ack| ack.is_acknowledged())
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("envelope", &self.envelope)
            .field("acknowledged", &self.is_acknowledged())
            .finish_non_exhaustive()
    }
}
