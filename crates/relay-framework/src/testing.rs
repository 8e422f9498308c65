//! Test doubles shared by the unit tests of this crate.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use relay_core::{
    EventEnvelope, MessageHandle, RemoteClient, RemoteError, RemoteResult, ScheduleHandle,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RemoteCall {
    Post {
        channel: String,
        text: String,
        blocks: Option<Value>,
    },
    Schedule {
        channel: String,
        post_at: i64,
        text: String,
    },
    Reaction {
        channel: String,
        timestamp: String,
        name: String,
    },
    Ack {
        action_id: Option<String>,
    },
}

/// Records every call; optionally rejects reactions.
#[derive(Debug, Default)]
pub(crate) struct RecordingClient {
    calls: Mutex<Vec<RemoteCall>>,
    reject_reactions: bool,
}

impl RecordingClient {
    pub(crate) fn rejecting_reactions() -> Self {
        Self {
            reject_reactions: true,
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn posts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Post { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn ack_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, RemoteCall::Ack { .. }))
            .count()
    }
}

#[async_trait]
impl RemoteClient for RecordingClient {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        blocks: Option<Value>,
    ) -> RemoteResult<MessageHandle> {
        let mut calls = self.calls.lock();
        calls.push(RemoteCall::Post {
            channel: channel.to_string(),
            text: text.to_string(),
            blocks,
        });
        Ok(MessageHandle {
            channel: channel.to_string(),
            ts: format!("{}.000000", calls.len()),
        })
    }

    async fn schedule_message(
        &self,
        channel: &str,
        post_at: i64,
        text: &str,
    ) -> RemoteResult<ScheduleHandle> {
        self.calls.lock().push(RemoteCall::Schedule {
            channel: channel.to_string(),
            post_at,
            text: text.to_string(),
        });
        Ok(ScheduleHandle {
            channel: channel.to_string(),
            scheduled_message_id: "Q1".to_string(),
            post_at,
        })
    }

    async fn add_reaction(&self, channel: &str, timestamp: &str, name: &str) -> RemoteResult<()> {
        if self.reject_reactions {
            return Err(RemoteError::api("reactions.add", "already_reacted"));
        }
        self.calls.lock().push(RemoteCall::Reaction {
            channel: channel.to_string(),
            timestamp: timestamp.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    async fn acknowledge(&self, envelope: &EventEnvelope) -> RemoteResult<()> {
        self.calls.lock().push(RemoteCall::Ack {
            action_id: envelope.action_id().map(str::to_string),
        });
        Ok(())
    }
}
