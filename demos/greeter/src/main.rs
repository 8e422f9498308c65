//! Greeter Demo
//!
//! Wires the reference listeners to a [`RelayRuntime`] and feeds it events
//! read as JSON lines from stdin. Each line is either a tagged raw event or a
//! bare platform payload:
//!
//! ```text
//! {"category": "message", "payload": {"type": "message", "channel": "C1", "user": "U1", "text": "knock knock"}}
//! {"type": "team_join", "user": "U2"}
//! ```
//!
//! The remote calls the listeners make are written to stdout as JSON lines;
//! logs go to stderr unless the configuration says otherwise.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package greeter < events.jsonl
//! ```

mod client;
mod listeners;

use anyhow::Result;
use relay::prelude::*;
use relay::runtime::config::{LogOutput, LoggingConfig, RelayConfig};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::client::OutboxClient;

/// Parses one input line into a raw event.
fn parse_line(line: &str) -> Result<RawEvent> {
    let value: Value = serde_json::from_str(line)?;
    if value.get("payload").is_some() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(RawEvent::untagged(value))
    }
}

/// Forwards stdin lines until EOF or until the runtime stops listening.
async fn read_stdin(sender: EventSender) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(event) => {
                if sender.send(event).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Skipping unparsable input line"),
        }
    }
    info!("Input exhausted");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the outbox
    let base = RelayConfig {
        logging: LoggingConfig {
            output: LogOutput::Stderr,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut runtime = RelayRuntime::builder()
        .merge(base)
        .build()?
        .with_client(Arc::new(OutboxClient::stdout()));
    listeners::register(runtime.registry_mut());

    let (sender, receiver) = runtime.channel();
    let reader = tokio::spawn(read_stdin(sender));

    runtime.run(receiver).await?;
    reader.abort();

    Ok(())
}
