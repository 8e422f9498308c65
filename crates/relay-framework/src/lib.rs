//! # Relay Framework
//!
//! Registration and dispatch on top of the `relay-core` types.
//!
//! This layer provides:
//! - Handler trait with a blanket impl for async closures and `async fn`s
//! - Listener registry keyed by category, preserving registration order
//! - Per-invocation handler contexts with `reply` and acknowledgment
//! - The dispatcher, which fans one envelope out to every matching handler
//!   concurrently and isolates their failures

pub mod ack;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;

#[cfg(test)]
mod testing;

pub use ack::Acknowledger;
pub use context::HandlerContext;
pub use dispatcher::{DEFAULT_ACK_TIMEOUT, DispatchReport, Dispatcher};
pub use error::{AckError, AckResult, DispatchError};
pub use handler::{BoxFuture, BoxedHandler, Handler, HandlerResult, into_handler};
pub use registry::{Binding, Registry};

/// Everything a listener module usually needs.
pub mod prelude {
    pub use crate::{HandlerContext, HandlerResult, Registry};
    pub use relay_core::{Category, EventEnvelope, Matcher, RemoteClient};
    pub use std::sync::Arc;
}
