//! Handler system for the Relay framework.
//!
//! A handler is any async callable taking a [`HandlerContext`] and the shared
//! [`EventEnvelope`] and returning a [`HandlerResult`]. Closures and `async fn`s
//! qualify through a blanket implementation; registries store them type-erased
//! as [`BoxedHandler`].
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_framework::{HandlerContext, HandlerResult};
//!
//! async fn knock_knock(ctx: HandlerContext, _envelope: Arc<EventEnvelope>) -> HandlerResult {
//!     ctx.reply("_Who's there?_ Me").await?;
//!     Ok(())
//! }
//!
//! registry.on_message("knock knock", knock_knock);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use relay_core::EventEnvelope;

use crate::context::HandlerContext;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler returns. Any error becomes a handler failure in the
/// dispatch report; it never reaches sibling handlers.
pub type HandlerResult = anyhow::Result<()>;

/// The core trait for event handlers.
///
/// Implemented automatically for
/// `Fn(HandlerContext, Arc<EventEnvelope>) -> impl Future<Output = HandlerResult>`.
/// Implement it by hand for handlers that carry their own state.
pub trait Handler: Send + Sync + 'static {
    /// Runs the handler for one envelope.
    fn call(&self, ctx: HandlerContext, envelope: Arc<EventEnvelope>)
    -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(
        &self,
        ctx: HandlerContext,
        envelope: Arc<EventEnvelope>,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(ctx, envelope))
    }
}

/// A type-erased handler that can be stored in collections.
pub type BoxedHandler = Arc<dyn Handler>;

/// Converts a handler function into a [`BoxedHandler`].
pub fn into_handler<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}
