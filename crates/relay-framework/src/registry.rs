//! Listener registry.
//!
//! The [`Registry`] keeps, per [`Category`], the ordered list of
//! [`Binding`]s registered for it. It is filled during startup and then
//! handed to a [`Dispatcher`](crate::Dispatcher), which freezes it behind an
//! `Arc`; there is no way to add or remove bindings after that.
//!
//! ```rust,ignore
//! let mut registry = Registry::new();
//!
//! registry.on_message("knock knock", knock_knock);
//! registry.on_event_type("team_join", welcome);
//! registry
//!     .on_action(Matcher::field("action_id", "approve_button"), approve)
//!     .named("approve");
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use relay_core::{Category, EventEnvelope, Matcher};

use crate::context::HandlerContext;
use crate::handler::{BoxedHandler, HandlerResult, into_handler};

/// A registered (category, matcher, handler) triple.
pub struct Binding {
    category: Category,
    index: usize,
    matcher: Matcher,
    handler: BoxedHandler,
    name: Option<String>,
}

impl Binding {
    /// Sets a name used to label this binding in logs and reports.
    pub fn named(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the category this binding listens on.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns the binding's position within its category.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the binding's matcher.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Returns the name, if one was set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Label used in logs: the name, or `category#index`.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}#{}", self.category, self.index),
        }
    }

    pub(crate) fn handler(&self) -> &BoxedHandler {
        &self.handler
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("category", &self.category)
            .field("index", &self.index)
            .field("matcher", &self.matcher)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered bindings per category.
#[derive(Default)]
pub struct Registry {
    bindings: HashMap<Category, Vec<Binding>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binding for `category`.
    ///
    /// The same matcher may be registered any number of times; every copy
    /// fires, in registration order.
    pub fn register<F, Fut>(
        &mut self,
        category: Category,
        matcher: impl Into<Matcher>,
        handler: F,
    ) -> &mut Binding
    where
        F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_boxed(category, matcher, into_handler(handler))
    }

    /// Appends a binding with an already boxed handler.
    pub fn register_boxed(
        &mut self,
        category: Category,
        matcher: impl Into<Matcher>,
        handler: BoxedHandler,
    ) -> &mut Binding {
        let list = self.bindings.entry(category).or_default();
        let index = list.len();
        list.push(Binding {
            category,
            index,
            matcher: matcher.into(),
            handler,
            name: None,
        });
        &mut list[index]
    }

    /// Listens for messages matching `matcher`.
    pub fn on_message<F, Fut>(&mut self, matcher: impl Into<Matcher>, handler: F) -> &mut Binding
    where
        F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Category::Message, matcher, handler)
    }

    /// Listens for every envelope of `category`.
    pub fn on_event<F, Fut>(&mut self, category: Category, handler: F) -> &mut Binding
    where
        F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(category, Matcher::Any, handler)
    }

    /// Listens for one platform event type, e.g. `team_join`.
    pub fn on_event_type<F, Fut>(&mut self, event_type: &str, handler: F) -> &mut Binding
    where
        F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(
            Category::classify(event_type),
            Matcher::field("type", event_type),
            handler,
        )
    }

    /// Listens for interactive actions matching `matcher`.
    pub fn on_action<F, Fut>(&mut self, matcher: impl Into<Matcher>, handler: F) -> &mut Binding
    where
        F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Category::Action, matcher, handler)
    }

    /// Listens for interactive actions with the given `action_id`.
    pub fn on_action_id<F, Fut>(&mut self, action_id: &str, handler: F) -> &mut Binding
    where
        F: Fn(HandlerContext, Arc<EventEnvelope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_action(Matcher::field("action_id", action_id), handler)
    }

    /// Bindings matching `envelope`, in registration order.
    ///
    /// The iterator is lazy; each dispatch derives a fresh one.
    pub fn lookup<'a>(&'a self, envelope: &'a EventEnvelope) -> impl Iterator<Item = &'a Binding> {
        self.bindings(envelope.category())
            .iter()
            .filter(move |binding| binding.matcher.evaluate(envelope))
    }

    /// All bindings of one category, in registration order.
    pub fn bindings(&self, category: Category) -> &[Binding] {
        self.bindings.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Total number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for category in Category::ALL {
            let count = self.bindings(category).len();
            if count > 0 {
                map.entry(&category, &count);
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    async fn noop(_ctx: HandlerContext, _envelope: Arc<EventEnvelope>) -> HandlerResult {
        Ok(())
    }

    fn envelope(category: Category, payload: Value) -> EventEnvelope {
        EventEnvelope::new(category, payload).unwrap()
    }

    fn labels<'a>(bindings: impl Iterator<Item = &'a Binding>) -> Vec<String> {
        bindings.map(Binding::label).collect()
    }

    #[test]
    fn test_lookup_agrees_with_evaluate() {
        let mut registry = Registry::new();
        let matchers = [
            Matcher::text_contains("👋"),
            Matcher::text_equals("knock knock"),
            Matcher::subtype("bot_message"),
            Matcher::field("user", "U1"),
            Matcher::fields([("user", "U1"), ("channel", "C1")]),
            Matcher::Any,
        ];
        for matcher in &matchers {
            registry.on_message(matcher.clone(), noop);
        }

        let envelopes = [
            envelope(Category::Message, json!({ "channel": "C1", "user": "U1", "text": "👋 hi" })),
            envelope(Category::Message, json!({ "channel": "C2", "user": "U1", "text": "knock knock" })),
            envelope(Category::Message, json!({ "channel": "C1", "subtype": "bot_message", "text": "beep" })),
            envelope(Category::Message, json!({ "channel": "C3" })),
        ];

        for env in &envelopes {
            let found: Vec<usize> = registry.lookup(env).map(Binding::index).collect();
            let expected: Vec<usize> = matchers
                .iter()
                .enumerate()
                .filter(|(_, m)| m.evaluate(env))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(found, expected, "envelope {env:?}");
        }
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = Registry::new();
        registry.on_action_id("approve_button", noop).named("h1");
        registry.on_action_id("approve_button", noop).named("h2");

        let env = envelope(Category::Action, json!({ "action_id": "approve_button" }));
        assert_eq!(labels(registry.lookup(&env)), ["h1", "h2"]);
    }

    #[test]
    fn test_lookup_only_sees_own_category() {
        let mut registry = Registry::new();
        registry.on_message(Matcher::Any, noop);
        registry.on_event(Category::Reaction, noop);

        let env = envelope(Category::Reaction, json!({ "reaction": "calendar" }));
        assert_eq!(labels(registry.lookup(&env)), ["reaction#0"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_on_event_type() {
        let mut registry = Registry::new();
        registry.on_event_type("team_join", noop);

        let joined = envelope(Category::Membership, json!({ "type": "team_join", "user": "U1" }));
        let left = envelope(
            Category::Membership,
            json!({ "type": "member_left_channel", "user": "U1" }),
        );

        assert_eq!(registry.bindings(Category::Membership).len(), 1);
        assert_eq!(registry.lookup(&joined).count(), 1);
        assert_eq!(registry.lookup(&left).count(), 0);
    }

    #[test]
    fn test_fields_equal_versus_different_block() {
        let mut registry = Registry::new();
        registry
            .on_action(
                Matcher::fields([("action_id", "select_user"), ("block_id", "assign_ticket")]),
                noop,
            )
            .named("assign");
        registry
            .on_action(
                Matcher::field("action_id", "select_user").and(Matcher::field("block_id", "other")),
                noop,
            )
            .named("other");

        let env = envelope(
            Category::Action,
            json!({ "action_id": "select_user", "block_id": "assign_ticket" }),
        );
        assert_eq!(labels(registry.lookup(&env)), ["assign"]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        let env = envelope(Category::Other, json!({}));
        assert!(registry.is_empty());
        assert_eq!(registry.lookup(&env).count(), 0);
        assert_eq!(format!("{registry:?}"), "{}");
    }
}
