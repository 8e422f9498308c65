//! Event dispatcher for the Relay framework.
//!
//! The [`Dispatcher`] owns the frozen [`Registry`] and the remote client.
//! When an envelope is dispatched:
//!
//! 1. Bindings of the envelope's category are filtered by their matchers,
//!    in registration order
//! 2. Each matching handler gets a fresh [`HandlerContext`] and is started in
//!    that order; the handlers then run concurrently
//! 3. A failing or panicking handler is logged and recorded, its siblings are
//!    unaffected
//! 4. Action handlers are watched for their acknowledgment deadline
//!
//! Dispatch returns once every handler has settled.
//!
//! ```rust,ignore
//! use relay_framework::{Dispatcher, Registry};
//!
//! let mut registry = Registry::new();
//! registry.on_message("knock knock", knock_knock);
//!
//! let dispatcher = Dispatcher::new(registry, client);
//! let report = dispatcher.dispatch_raw(raw_event).await;
//! ```

use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use tower::Service;
use tracing::{Instrument, debug, debug_span, error, trace, warn};

use relay_core::{BoxedClient, Category, EventEnvelope, RawEvent};

use crate::ack::{self, AckWatch};
use crate::context::HandlerContext;
use crate::error::DispatchError;
use crate::handler::BoxFuture;
use crate::registry::{Binding, Registry};

/// Acknowledgment deadline used unless configured otherwise.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// Outcome of dispatching one envelope.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Category of the envelope.
    pub category: Category,
    /// Number of handlers that were invoked.
    pub matched: usize,
    /// Everything that went wrong, in binding order.
    pub failures: Vec<DispatchError>,
}

impl DispatchReport {
    fn empty(category: Category) -> Self {
        Self {
            category,
            matched: 0,
            failures: Vec::new(),
        }
    }

    /// Returns `true` if nothing went wrong.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Handler failures only.
    pub fn handler_failures(&self) -> impl Iterator<Item = &DispatchError> {
        self.failures.iter().filter(|e| e.is_handler_failure())
    }

    /// Acknowledgment timeouts only.
    pub fn ack_timeouts(&self) -> impl Iterator<Item = &DispatchError> {
        self.failures.iter().filter(|e| e.is_ack_timeout())
    }
}

/// The central event dispatcher.
///
/// Cheap to clone; clones share the registry and the client.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    client: BoxedClient,
    ack_timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher, freezing the registry.
    pub fn new(registry: Registry, client: BoxedClient) -> Self {
        Self {
            registry: Arc::new(registry),
            client,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        }
    }

    /// Sets the acknowledgment deadline for action handlers.
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the acknowledgment deadline.
    pub fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }

    /// Normalizes a raw event and dispatches it.
    ///
    /// A malformed payload is logged and reported without running any
    /// handler.
    pub async fn dispatch_raw(&self, raw: RawEvent) -> DispatchReport {
        let category = raw.category();
        match EventEnvelope::from_raw(raw) {
            Ok(envelope) => self.dispatch(Arc::new(envelope)).await,
            Err(err) => {
                error!(%category, error = %err, "Dropping malformed event");
                DispatchReport {
                    category,
                    matched: 0,
                    failures: vec![err.into()],
                }
            }
        }
    }

    /// Dispatches an envelope to every matching handler.
    pub async fn dispatch(&self, envelope: Arc<EventEnvelope>) -> DispatchReport {
        let span = debug_span!("dispatch", category = %envelope.category());
        self.dispatch_matching(envelope).instrument(span).await
    }

    async fn dispatch_matching(&self, envelope: Arc<EventEnvelope>) -> DispatchReport {
        let category = envelope.category();
        let invocations: Vec<_> = self
            .registry
            .lookup(&envelope)
            .map(|binding| self.invoke(binding, Arc::clone(&envelope)))
            .collect();

        if invocations.is_empty() {
            trace!("No binding matched");
            return DispatchReport::empty(category);
        }

        let matched = invocations.len();
        debug!(matched, "Invoking matching handlers");

        let failures = join_all(invocations)
            .await
            .into_iter()
            .flatten()
            .collect();

        DispatchReport {
            category,
            matched,
            failures,
        }
    }

    /// Runs one binding's handler, isolating its failure.
    ///
    /// The returned future owns everything it touches.
    fn invoke(
        &self,
        binding: &Binding,
        envelope: Arc<EventEnvelope>,
    ) -> BoxFuture<'static, Vec<DispatchError>> {
        let label = binding.label();
        let handler = Arc::clone(binding.handler());
        let client = Arc::clone(&self.client);
        let ack_timeout = self.ack_timeout;

        Box::pin(async move {
            let (ack, watch) = match envelope.category() {
                Category::Action => {
                    let (ack, watch) = ack::pair(ack_timeout);
                    (Some(ack), Some(watch))
                }
                _ => (None, None),
            };

            let ctx = HandlerContext::new(Arc::clone(&envelope), Arc::clone(&client), ack);
            let handler_envelope = Arc::clone(&envelope);
            let call = AssertUnwindSafe(async move { handler.call(ctx, handler_envelope).await })
                .catch_unwind();

            trace!(handler = %label, "Executing handler");
            let (outcome, missed_ack) = match watch {
                Some(watch) => tokio::join!(call, watch_ack(watch, &client, &envelope, &label)),
                None => (call.await, None),
            };

            let mut failures = Vec::new();
            match outcome {
                Ok(Ok(())) => trace!(handler = %label, "Handler finished"),
                Ok(Err(err)) => {
                    let reason = format!("{err:#}");
                    error!(handler = %label, error = %reason, "Handler failed");
                    failures.push(DispatchError::HandlerFailure {
                        handler: label.clone(),
                        reason,
                    });
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!(handler = %label, error = %reason, "Handler panicked");
                    failures.push(DispatchError::HandlerFailure {
                        handler: label.clone(),
                        reason,
                    });
                }
            }
            failures.extend(missed_ack);
            failures
        })
    }
}

/// Waits for the acknowledgment and forwards it to the platform.
async fn watch_ack(
    watch: AckWatch,
    client: &BoxedClient,
    envelope: &EventEnvelope,
    label: &str,
) -> Option<DispatchError> {
    let timeout = watch.deadline();
    let outcome = watch.wait().await;

    if outcome.is_missed() {
        warn!(handler = %label, ?timeout, ?outcome, "Action not acknowledged in time");
        return Some(DispatchError::AcknowledgmentTimeout {
            handler: label.to_string(),
            timeout,
        });
    }

    if let Err(err) = client.acknowledge(envelope).await {
        warn!(handler = %label, error = %err, "Failed to forward acknowledgment");
    }
    None
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("ack_timeout", &self.ack_timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tower Service Implementation for Dispatcher
// ============================================================================

/// Lets Tower middleware wrap the dispatcher.
///
/// Dispatch never fails as a whole, so the error type is [`Infallible`];
/// per-handler problems are in the [`DispatchReport`].
impl Service<Arc<EventEnvelope>> for Dispatcher {
    type Response = DispatchReport;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, envelope: Arc<EventEnvelope>) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(envelope).await) })
    }
}
