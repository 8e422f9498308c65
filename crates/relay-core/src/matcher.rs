//! Declarative match criteria.
//!
//! A [`Matcher`] is a pure predicate over an [`EventEnvelope`]. Evaluating it
//! never fails: a field that is absent, or that the category does not carry,
//! is simply a non-match.
//!
//! ```rust,ignore
//! use relay_core::Matcher;
//!
//! // "knock knock" anywhere in the message text
//! let knock = Matcher::text_contains("knock knock");
//!
//! // both ids must match
//! let assign = Matcher::fields([
//!     ("action_id", "select_user"),
//!     ("block_id", "assign_ticket"),
//! ]);
//! ```

use serde_json::Value;

use crate::envelope::EventEnvelope;

/// A predicate selecting which envelopes a binding applies to.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Matcher {
    /// Matches every envelope.
    #[default]
    Any,
    /// Primary text contains the substring (case-sensitive).
    TextContains(String),
    /// Primary text equals the literal.
    TextEquals(String),
    /// The `subtype` field equals the value.
    SubtypeEquals(String),
    /// The named field equals the value.
    FieldEquals(String, Value),
    /// Every named field equals its value.
    FieldsEqual(Vec<(String, Value)>),
    /// Every inner matcher matches.
    All(Vec<Matcher>),
}

impl Matcher {
    /// Creates a [`Matcher::TextContains`].
    pub fn text_contains(s: impl Into<String>) -> Self {
        Self::TextContains(s.into())
    }

    /// Creates a [`Matcher::TextEquals`].
    pub fn text_equals(s: impl Into<String>) -> Self {
        Self::TextEquals(s.into())
    }

    /// Creates a [`Matcher::SubtypeEquals`].
    pub fn subtype(s: impl Into<String>) -> Self {
        Self::SubtypeEquals(s.into())
    }

    /// Creates a [`Matcher::FieldEquals`].
    pub fn field(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::FieldEquals(name.into(), value.into())
    }

    /// Creates a [`Matcher::FieldsEqual`] from name/value pairs.
    pub fn fields<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::FieldsEqual(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Combines this matcher with another; both must match.
    pub fn and(self, other: Matcher) -> Self {
        match self {
            Self::Any => other,
            Self::All(mut inner) => {
                inner.push(other);
                Self::All(inner)
            }
            this => Self::All(vec![this, other]),
        }
    }

    /// Evaluates the predicate against an envelope.
    pub fn evaluate(&self, envelope: &EventEnvelope) -> bool {
        match self {
            Self::Any => true,
            Self::TextContains(s) => envelope.text().is_some_and(|text| text.contains(s.as_str())),
            Self::TextEquals(s) => envelope.text() == Some(s.as_str()),
            Self::SubtypeEquals(s) => envelope.subtype() == Some(s.as_str()),
            Self::FieldEquals(name, value) => envelope.field(name) == Some(value),
            Self::FieldsEqual(pairs) => pairs
                .iter()
                .all(|(name, value)| envelope.field(name) == Some(value)),
            Self::All(matchers) => matchers.iter().all(|m| m.evaluate(envelope)),
        }
    }
}

/// A bare string is a substring pattern on the message text.
impl From<&str> for Matcher {
    fn from(s: &str) -> Self {
        Self::TextContains(s.to_string())
    }
}

impl From<String> for Matcher {
    fn from(s: String) -> Self {
        Self::TextContains(s)
    }
}
