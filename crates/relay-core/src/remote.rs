//! Remote platform capability.
//!
//! Handlers talk to the platform only through a [`RemoteClient`]. The core
//! never inspects what a call did; failures are the calling handler's concern.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::EventEnvelope;
use crate::error::RemoteResult;

/// Identifies a message posted through [`RemoteClient::post_message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle {
    /// Channel the message was posted to.
    pub channel: String,
    /// Platform timestamp of the message, which doubles as its id.
    pub ts: String,
}

/// Identifies a message scheduled through [`RemoteClient::schedule_message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleHandle {
    /// Channel the message will be posted to.
    pub channel: String,
    /// Platform id of the scheduled message.
    pub scheduled_message_id: String,
    /// Unix time at which the message will be posted.
    pub post_at: i64,
}

/// Outbound calls available to handlers.
///
/// Implementations wrap whatever transport reaches the platform's API.
#[async_trait]
pub trait RemoteClient: Send + Sync + 'static {
    /// Posts a message, optionally with a block payload.
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        blocks: Option<Value>,
    ) -> RemoteResult<MessageHandle>;

    /// Schedules a message for `post_at` (Unix seconds).
    async fn schedule_message(
        &self,
        channel: &str,
        post_at: i64,
        text: &str,
    ) -> RemoteResult<ScheduleHandle>;

    /// Adds a reaction to the message at `timestamp`.
    async fn add_reaction(&self, channel: &str, timestamp: &str, name: &str) -> RemoteResult<()>;

    /// Tells the platform that an interactive envelope was received.
    ///
    /// Called by the dispatcher once per acknowledged handler. Transports
    /// that acknowledge at the socket level can keep the default.
    async fn acknowledge(&self, _envelope: &EventEnvelope) -> RemoteResult<()> {
        Ok(())
    }
}

/// A shared [`RemoteClient`] trait object.
pub type BoxedClient = Arc<dyn RemoteClient>;
