//! The Relay runtime: registration at startup, then the serving loop.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use relay_runtime::RelayRuntime;
//!
//! let mut runtime = RelayRuntime::new().with_client(client);
//! runtime.on_message("knock knock", knock_knock);
//!
//! let (sender, receiver) = runtime.channel();
//! tokio::spawn(feed_transport_events(sender));
//!
//! runtime.run(receiver).await?;
//! ```
//!
//! Serving consumes the runtime: the registry is frozen inside the
//! [`Dispatcher`] and every received event is dispatched in its own task, so
//! a slow handler never delays the next event.

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use relay_core::{BoxedClient, Category, EventEnvelope, Matcher, RawEvent};
use relay_framework::{Binding, DispatchReport, Dispatcher, HandlerContext, HandlerResult, Registry};

use crate::config::{ConfigLoader, ConfigResult, RelayConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Sending half of the inbound event queue, held by the transport.
pub type EventSender = mpsc::Sender<RawEvent>;

/// Receiving half of the inbound event queue, consumed by the runtime.
pub type EventReceiver = mpsc::Receiver<RawEvent>;

/// The main Relay runtime.
pub struct RelayRuntime {
    config: RelayConfig,
    registry: Registry,
    client: Option<BoxedClient>,
}

impl RelayRuntime {
    /// Creates a runtime, loading configuration from the current directory.
    ///
    /// Falls back to the defaults if loading fails.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                RelayConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration, initializing logging.
    pub fn from_config(config: &RelayConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            ack_timeout_ms = config.dispatch.ack_timeout_ms,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            registry: Registry::new(),
            client: None,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Sets the remote client handed to every handler.
    pub fn with_client(mut self, client: BoxedClient) -> Self {
        self.client = Some(client);
        self
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Returns the registry for direct registration.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// See [`Registry::on_message`].
    pub fn on_message<F, Fut>(&mut self, matcher: impl Into<Matcher>, handler: F) -> &mut Binding
    where
        F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_message(matcher, handler)
    }

    /// See [`Registry::on_event`].
    pub fn on_event<F, Fut>(&mut self, category: Category, handler: F) -> &mut Binding
    where
        F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_event(category, handler)
    }

    /// See [`Registry::on_event_type`].
    pub fn on_event_type<F, Fut>(&mut self, event_type: &str, handler: F) -> &mut Binding
    where
        F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_event_type(event_type, handler)
    }

    /// See [`Registry::on_action`].
    pub fn on_action<F, Fut>(&mut self, matcher: impl Into<Matcher>, handler: F) -> &mut Binding
    where
        F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_action(matcher, handler)
    }

    // =========================================================================
    // Serving
    // =========================================================================

    /// Creates the inbound queue with the configured capacity.
    pub fn channel(&self) -> (EventSender, EventReceiver) {
        mpsc::channel(self.config.dispatch.queue_capacity.max(1))
    }

    /// Freezes the registry into a [`Dispatcher`].
    pub fn into_dispatcher(self) -> RuntimeResult<Dispatcher> {
        let client = self.client.ok_or(RuntimeError::NoClient)?;
        Ok(Dispatcher::new(self.registry, client)
            .with_ack_timeout(self.config.dispatch.ack_timeout()))
    }

    /// Serves until every [`EventSender`] is dropped.
    pub async fn serve(self, receiver: EventReceiver) -> RuntimeResult<()> {
        self.serve_until(receiver, std::future::pending()).await
    }

    /// Serves until Ctrl+C, SIGTERM, or the channel closing.
    pub async fn run(self, receiver: EventReceiver) -> RuntimeResult<()> {
        info!("Relay runtime is now running. Press Ctrl+C to stop.");
        self.serve_until(receiver, wait_for_shutdown()).await
    }

    /// Serves until `shutdown` resolves or the channel closes.
    ///
    /// Events still queued at shutdown are not dispatched; dispatches already
    /// started are awaited before returning.
    pub async fn serve_until<F>(self, mut receiver: EventReceiver, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let dispatcher = self.into_dispatcher()?;
        let tracker = TaskTracker::new();
        tokio::pin!(shutdown);

        info!(registry = ?dispatcher.registry(), "Serving events");

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting events");
                    break;
                }
                next = receiver.recv() => match next {
                    Some(raw) => {
                        let dispatcher = dispatcher.clone();
                        tracker.spawn(async move {
                            log_report(&dispatcher.dispatch_raw(raw).await);
                        });
                    }
                    None => {
                        debug!("Event channel closed");
                        break;
                    }
                },
            }
        }

        tracker.close();
        if !tracker.is_empty() {
            info!(in_flight = tracker.len(), "Waiting for in-flight dispatches");
        }
        tracker.wait().await;

        info!("Relay runtime stopped");
        Ok(())
    }
}

impl Default for RelayRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn log_report(report: &DispatchReport) {
    if report.is_clean() {
        debug!(category = %report.category, matched = report.matched, "Dispatch finished");
    } else {
        warn!(
            category = %report.category,
            matched = report.matched,
            failures = report.failures.len(),
            "Dispatch finished with failures"
        );
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = wait_for_ctrl_c() => {}
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`RelayRuntime`] with custom configuration.
///
/// ```rust,ignore
/// let runtime = RelayRuntime::builder()
///     .config_file("config/relay.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges a programmatic base configuration.
    pub fn merge(mut self, config: RelayConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> ConfigResult<RelayRuntime> {
        let config = self.config_loader.load()?;
        Ok(RelayRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
