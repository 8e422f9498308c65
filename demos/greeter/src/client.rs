//! A remote client that writes the calls it would make as JSON lines.

use std::io::ErrorKind;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use relay::prelude::*;
use serde_json::{Value, json};
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use tracing::info;

/// Emits every call as one JSON line on `out` and answers with made-up
/// handles.
#[derive(Debug)]
pub struct OutboxClient<W = Stdout> {
    out: Mutex<W>,
    sequence: AtomicU64,
}

impl OutboxClient {
    /// A client writing to the process's stdout.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> OutboxClient<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            sequence: AtomicU64::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl<W: AsyncWrite + Unpin + Send> OutboxClient<W> {
    async fn emit(&self, call: Value) -> RemoteResult<()> {
        let mut line =
            serde_json::to_vec(&call).map_err(|e| RemoteError::Transport(e.to_string()))?;
        line.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&line).await.map_err(write_error)?;
        out.flush().await.map_err(write_error)
    }
}

/// A closed reader means nobody is listening on the other end anymore.
fn write_error(e: std::io::Error) -> RemoteError {
    match e.kind() {
        ErrorKind::BrokenPipe => RemoteError::NotConnected,
        _ => RemoteError::Transport(e.to_string()),
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send + 'static> RemoteClient for OutboxClient<W> {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        blocks: Option<Value>,
    ) -> RemoteResult<MessageHandle> {
        let ts = format!("{}.000000", self.next_seq());
        info!(channel, text, has_blocks = blocks.is_some(), %ts, "chat.postMessage");
        self.emit(json!({
            "method": "chat.postMessage",
            "channel": channel,
            "text": text,
            "blocks": blocks,
            "ts": ts,
        }))
        .await?;
        Ok(MessageHandle {
            channel: channel.to_string(),
            ts,
        })
    }

    async fn schedule_message(
        &self,
        channel: &str,
        post_at: i64,
        text: &str,
    ) -> RemoteResult<ScheduleHandle> {
        let id = format!("Q{}", self.next_seq());
        info!(channel, post_at, text, scheduled_message_id = %id, "chat.scheduleMessage");
        self.emit(json!({
            "method": "chat.scheduleMessage",
            "channel": channel,
            "post_at": post_at,
            "text": text,
            "scheduled_message_id": id,
        }))
        .await?;
        Ok(ScheduleHandle {
            channel: channel.to_string(),
            scheduled_message_id: id,
            post_at,
        })
    }

    async fn add_reaction(&self, channel: &str, timestamp: &str, name: &str) -> RemoteResult<()> {
        info!(channel, timestamp, name, "reactions.add");
        self.emit(json!({
            "method": "reactions.add",
            "channel": channel,
            "timestamp": timestamp,
            "name": name,
        }))
        .await
    }

    async fn acknowledge(&self, envelope: &EventEnvelope) -> RemoteResult<()> {
        info!(action_id = envelope.action_id(), "ack");
        self.emit(json!({ "method": "ack", "action_id": envelope.action_id() }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_calls_written_as_json_lines() {
        let client = OutboxClient::new(Vec::new());
        let handle = client.post_message("C1", "hi", None).await.unwrap();
        client.add_reaction("C1", &handle.ts, "wave").await.unwrap();

        let out = client.out.lock().await;
        let lines: Vec<Value> = out
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).unwrap())
            .collect();

        assert_eq!(handle.ts, "1.000000");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["method"], "chat.postMessage");
        assert_eq!(lines[0]["text"], "hi");
        assert_eq!(lines[1]["method"], "reactions.add");
        assert_eq!(lines[1]["timestamp"], "1.000000");
    }

    #[tokio::test]
    async fn test_closed_output_is_not_connected() {
        let out = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            .build();
        let client = OutboxClient::new(out);

        let err = client.post_message("C1", "hi", None).await.unwrap_err();
        assert_eq!(err, RemoteError::NotConnected);
    }

    #[tokio::test]
    async fn test_write_failure_is_transport_error() {
        let out = Builder::new()
            .write_error(io::Error::other("disk full"))
            .build();
        let client = OutboxClient::new(out);

        let err = client.add_reaction("C1", "1.0", "wave").await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(reason) if reason.contains("disk full")));
    }
}
