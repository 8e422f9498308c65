//! Relay Runtime: process-level wiring for the Relay dispatch engine.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `RelayConfig`)
//! - Logging configuration (`LoggingBuilder`)
//! - The serving loop (`RelayRuntime`), which receives raw events from a
//!   transport over a channel and dispatches each one in its own task
//!
//! ```ignore
//! use relay_runtime::RelayRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = RelayRuntime::new().with_client(Arc::new(MyClient::connect()?));
//!     runtime.on_event_type("team_join", welcome);
//!
//!     let (sender, receiver) = runtime.channel();
//!     tokio::spawn(my_transport(sender));
//!
//!     // Run until Ctrl+C
//!     runtime.run(receiver).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, RelayConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{EventReceiver, EventSender, RelayRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// The logging macros, for listener code that does not depend on `tracing`.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
