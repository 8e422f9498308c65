//! Event envelopes.
//!
//! An [`EventEnvelope`] is the normalized form of one inbound occurrence. The
//! category is decided exactly once, when the envelope is built, and the
//! payload fields are kept as an open key/value map so that fields the
//! platform adds later pass through untouched.
//!
//! ```rust,ignore
//! use relay_core::{Category, EventEnvelope};
//! use serde_json::json;
//!
//! let envelope = EventEnvelope::new(
//!     Category::Message,
//!     json!({ "type": "message", "channel": "C1", "user": "U1", "text": "knock knock" }),
//! )?;
//!
//! assert_eq!(envelope.text(), Some("knock knock"));
//! assert_eq!(envelope.reply_channel(), Some("C1"));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EnvelopeError, EnvelopeResult};

// ============================================================================
// Category
// ============================================================================

/// Coarse classification of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Messages posted to a channel, including system-generated ones.
    Message,
    /// Reactions added to or removed from an item.
    Reaction,
    /// Users joining or leaving the team or a channel.
    Membership,
    /// Interactive component triggers (buttons, selects, pickers).
    Action,
    /// Anything the core does not classify further.
    Other,
}

impl Category {
    /// All categories, in declaration order.
    pub const ALL: [Category; 5] = [
        Category::Message,
        Category::Reaction,
        Category::Membership,
        Category::Action,
        Category::Other,
    ];

    /// Returns the lowercase name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Reaction => "reaction",
            Self::Membership => "membership",
            Self::Action => "action",
            Self::Other => "other",
        }
    }

    /// Classifies a platform event type string.
    pub fn classify(event_type: &str) -> Self {
        match event_type {
            "message" => Self::Message,
            "reaction_added" | "reaction_removed" => Self::Reaction,
            "team_join" | "member_joined_channel" | "member_left_channel" => Self::Membership,
            "block_actions" | "block_action" | "interactive_message" => Self::Action,
            _ => Self::Other,
        }
    }

    /// Fields a payload of this category must carry.
    fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Message => &["channel"],
            Self::Reaction => &["reaction"],
            Self::Membership => &["user"],
            Self::Action => &["action_id"],
            Self::Other => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RawEvent
// ============================================================================

/// An untyped payload as delivered by the transport.
///
/// The transport may already know the category; when it does not, the
/// payload's own `type` field is used to classify it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Category supplied by the transport, if any.
    #[serde(default)]
    pub category: Option<Category>,
    /// The raw payload.
    pub payload: Value,
}

impl RawEvent {
    /// Creates a raw event with an explicit category.
    pub fn new(category: Category, payload: Value) -> Self {
        Self {
            category: Some(category),
            payload,
        }
    }

    /// Creates a raw event whose category is derived from the payload.
    pub fn untagged(payload: Value) -> Self {
        Self {
            category: None,
            payload,
        }
    }

    /// Returns the category, classifying from the payload's `type` if needed.
    pub fn category(&self) -> Category {
        self.category.unwrap_or_else(|| {
            self.payload
                .get("type")
                .and_then(Value::as_str)
                .map_or(Category::Other, Category::classify)
        })
    }
}

// ============================================================================
// EventEnvelope
// ============================================================================

/// Keys copied from the first entry of an interactive `actions` array.
const HOISTED_ACTION_KEYS: [(&str, &str); 4] = [
    ("action_id", "action_id"),
    ("block_id", "block_id"),
    ("value", "value"),
    ("type", "action_type"),
];

/// Normalized representation of one inbound occurrence.
///
/// Envelopes are immutable: there is no mutating accessor, and the dispatcher
/// shares them between handlers behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    category: Category,
    fields: Map<String, Value>,
}

impl EventEnvelope {
    /// Builds an envelope from a payload and its category.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::NotAnObject`] if the payload is not an object
    /// and [`EnvelopeError::Malformed`] if a field required by the category
    /// is absent or null.
    pub fn new(category: Category, payload: Value) -> EnvelopeResult<Self> {
        let Value::Object(mut fields) = payload else {
            return Err(EnvelopeError::NotAnObject { category });
        };

        if category == Category::Action {
            hoist_first_action(&mut fields);
        }

        for &field in category.required_fields() {
            if matches!(fields.get(field), None | Some(Value::Null)) {
                return Err(EnvelopeError::Malformed { category, field });
            }
        }

        Ok(Self { category, fields })
    }

    /// Builds an envelope from a transport-delivered [`RawEvent`].
    pub fn from_raw(raw: RawEvent) -> EnvelopeResult<Self> {
        let category = raw.category();
        Self::new(category, raw.payload)
    }

    /// Returns the envelope's category.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns every field of the payload, including unknown ones.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Looks up a field by name.
    ///
    /// Dotted paths such as `item.channel` walk into nested objects. A key
    /// that literally contains a dot is matched first.
    pub fn field(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.fields.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let first = self.fields.get(segments.next()?)?;
        segments.try_fold(first, |value, segment| value.get(segment))
    }

    /// Looks up a string field.
    pub fn str_field(&self, path: &str) -> Option<&str> {
        self.field(path).and_then(Value::as_str)
    }

    /// Resolves a field that is either a plain id or an object with an `id`.
    fn id_field(&self, path: &str) -> Option<&str> {
        let value = self.field(path)?;
        value
            .as_str()
            .or_else(|| value.get("id").and_then(Value::as_str))
    }

    /// The primary text field. Only messages carry one.
    pub fn text(&self) -> Option<&str> {
        match self.category {
            Category::Message => self.str_field("text"),
            _ => None,
        }
    }

    /// The user that caused the event.
    pub fn user(&self) -> Option<&str> {
        self.id_field("user")
    }

    /// The payload's `subtype` discriminator.
    pub fn subtype(&self) -> Option<&str> {
        self.str_field("subtype")
    }

    /// The platform event type, e.g. `reaction_added`.
    pub fn event_type(&self) -> Option<&str> {
        self.str_field("type")
    }

    /// The action identifier of an interactive trigger.
    pub fn action_id(&self) -> Option<&str> {
        self.str_field("action_id")
    }

    /// The block identifier of an interactive trigger.
    pub fn block_id(&self) -> Option<&str> {
        self.str_field("block_id")
    }

    /// The reaction name of a reaction event.
    pub fn reaction(&self) -> Option<&str> {
        self.str_field("reaction")
    }

    /// The type of item a reaction targets (`message`, `file`, ...).
    pub fn item_type(&self) -> Option<&str> {
        self.str_field("item.type")
    }

    /// Channel a reply to this envelope should go to.
    pub fn reply_channel(&self) -> Option<&str> {
        match self.category {
            Category::Reaction => self.id_field("item.channel"),
            _ => self.id_field("channel"),
        }
    }

    /// Timestamp of the message this envelope refers to.
    pub fn message_ts(&self) -> Option<&str> {
        match self.category {
            Category::Message => self.str_field("ts"),
            Category::Reaction => self.str_field("item.ts"),
            Category::Action => self.str_field("message.ts"),
            _ => None,
        }
    }
}

fn hoist_first_action(fields: &mut Map<String, Value>) {
    if fields.contains_key("action_id") {
        return;
    }

    let Some(first) = fields
        .get("actions")
        .and_then(Value::as_array)
        .and_then(|actions| actions.first())
        .and_then(Value::as_object)
        .cloned()
    else {
        return;
    };

    for (from, to) in HOISTED_ACTION_KEYS {
        if let Some(value) = first.get(from) {
            fields.entry(to).or_insert_with(|| value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_event_types() {
        assert_eq!(Category::classify("message"), Category::Message);
        assert_eq!(Category::classify("reaction_added"), Category::Reaction);
        assert_eq!(Category::classify("team_join"), Category::Membership);
        assert_eq!(Category::classify("block_actions"), Category::Action);
        assert_eq!(Category::classify("app_home_opened"), Category::Other);
        assert_eq!(Category::classify("member_left_channel"), Category::Membership);
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let envelope = EventEnvelope::new(
            Category::Message,
            json!({ "channel": "C1", "text": "hi", "brand_new_field": { "nested": 1 } }),
        )
        .unwrap();

        assert_eq!(envelope.field("brand_new_field.nested"), Some(&json!(1)));
        assert_eq!(envelope.fields().len(), 3);
    }

    #[test]
    fn test_missing_required_field() {
        let err = EventEnvelope::new(Category::Action, json!({ "block_id": "b" })).unwrap_err();
        assert_eq!(
            err,
            EnvelopeError::Malformed {
                category: Category::Action,
                field: "action_id",
            }
        );

        let err = EventEnvelope::new(Category::Message, json!({ "channel": null })).unwrap_err();
        assert!(matches!(err, EnvelopeError::Malformed { field: "channel", .. }));
    }

    #[test]
    fn test_non_object_payload() {
        let err = EventEnvelope::new(Category::Other, json!("hello")).unwrap_err();
        assert_eq!(
            err,
            EnvelopeError::NotAnObject {
                category: Category::Other
            }
        );
    }

    #[test]
    fn test_action_fields_hoisted_from_actions_array() {
        let envelope = EventEnvelope::new(
            Category::Action,
            json!({
                "type": "block_actions",
                "user": { "id": "U1" },
                "channel": { "id": "C9" },
                "message": { "ts": "1700000000.000100" },
                "actions": [
                    { "action_id": "select_user", "block_id": "assign_ticket", "type": "users_select" },
                    { "action_id": "ignored" }
                ]
            }),
        )
        .unwrap();

        assert_eq!(envelope.action_id(), Some("select_user"));
        assert_eq!(envelope.block_id(), Some("assign_ticket"));
        assert_eq!(envelope.event_type(), Some("block_actions"));
        assert_eq!(envelope.str_field("action_type"), Some("users_select"));
        assert_eq!(envelope.user(), Some("U1"));
        assert_eq!(envelope.reply_channel(), Some("C9"));
        assert_eq!(envelope.message_ts(), Some("1700000000.000100"));
    }

    #[test]
    fn test_text_only_for_messages() {
        let envelope = EventEnvelope::new(
            Category::Membership,
            json!({ "type": "team_join", "user": "U1", "text": "not primary" }),
        )
        .unwrap();
        assert_eq!(envelope.text(), None);
    }

    #[test]
    fn test_reaction_reply_channel_uses_item() {
        let envelope = EventEnvelope::new(
            Category::Reaction,
            json!({
                "type": "reaction_added",
                "reaction": "calendar",
                "item": { "type": "message", "channel": "C2", "ts": "1.2" }
            }),
        )
        .unwrap();

        assert_eq!(envelope.reply_channel(), Some("C2"));
        assert_eq!(envelope.item_type(), Some("message"));
        assert_eq!(envelope.message_ts(), Some("1.2"));
    }

    #[test]
    fn test_raw_event_classification() {
        let raw = RawEvent::untagged(json!({ "type": "reaction_added", "reaction": "eyes" }));
        assert_eq!(raw.category(), Category::Reaction);

        let raw = RawEvent::untagged(json!({ "no_type": true }));
        assert_eq!(raw.category(), Category::Other);

        let raw = RawEvent::new(Category::Message, json!({ "type": "reaction_added" }));
        assert_eq!(raw.category(), Category::Message);
    }

    #[test]
    fn test_raw_event_deserialize_without_category() {
        let raw: RawEvent =
            serde_json::from_value(json!({ "payload": { "type": "team_join", "user": "U1" } }))
                .unwrap();
        let envelope = EventEnvelope::from_raw(raw).unwrap();
        assert_eq!(envelope.category(), Category::Membership);
    }
}
