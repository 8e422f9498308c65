//! # Relay
//!
//! Listener registry and dispatch engine for chat-platform integrations.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  RawEvent  ┌──────────────┐     ┌──────────────────────────────────┐
//! │ Transport │───────────▶│ RelayRuntime │────▶│ Dispatcher (one task per event)  │
//! └───────────┘  (mpsc)    └──────────────┘     │  ├─ handler #0  (own context)    │──▶ RemoteClient
//!                                               │  ├─ handler #1  (own context)    │──▶ RemoteClient
//!                                               │  └─ ...                          │
//!                                               └──────────────────────────────────┘
//! ```
//!
//! - **Envelopes**: raw payloads normalized into a category plus a field map
//! - **Matchers**: declarative predicates deciding which bindings fire
//! - **Registry**: ordered bindings per category, frozen before serving
//! - **Dispatcher**: starts matching handlers in registration order, runs them
//!   concurrently, isolates their failures and watches action acknowledgments
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use relay::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = RelayRuntime::new().with_client(Arc::new(MyClient::default()));
//!
//!     runtime.on_message("knock knock", |ctx, _envelope| async move {
//!         ctx.reply("_Who's there?_ Me").await?;
//!         Ok(())
//!     });
//!
//!     let (sender, receiver) = runtime.channel();
//!     tokio::spawn(my_transport(sender));
//!     runtime.run(receiver).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use relay_core as core;
pub use relay_framework as framework;
pub use relay_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use relay::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use relay_runtime::{EventReceiver, EventSender, RelayRuntime};

    // Envelopes and matching
    pub use relay_core::{Category, EventEnvelope, Matcher, RawEvent};

    // Handlers
    pub use relay_framework::{AckError, HandlerContext, HandlerResult, Registry};

    // Remote capability, for implementing clients
    pub use relay_core::{
        BoxedClient, MessageHandle, RemoteClient, RemoteError, RemoteResult, ScheduleHandle,
    };

    pub use std::sync::Arc;
}
