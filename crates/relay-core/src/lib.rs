//! # Relay Core
//!
//! Leaf types of the Relay dispatch engine:
//!
//! - **Envelopes**: normalized inbound occurrences ([`EventEnvelope`], [`Category`], [`RawEvent`])
//! - **Matchers**: pure predicates over envelopes ([`Matcher`])
//! - **Remote client**: the outbound capability handlers call ([`RemoteClient`])
//!
//! Registration and dispatch are built on top of these in `relay-framework`.

pub mod envelope;
pub mod error;
pub mod matcher;
pub mod remote;

pub use envelope::{Category, EventEnvelope, RawEvent};
pub use error::{EnvelopeError, EnvelopeResult, RemoteError, RemoteResult};
pub use matcher::Matcher;
pub use remote::{BoxedClient, MessageHandle, RemoteClient, ScheduleHandle};
