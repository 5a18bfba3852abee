//! Message Model
//!
//! Wire shape of cross-frame protocol messages, the origin filter that decides
//! which of them belong to the protocol under test, and the normalized
//! [`CapturedMessage`] record the capture buffer stores.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Discriminator assigned when a payload has no string `type` field
pub const UNKNOWN_KIND: &str = "unknown";

/// Name of the discriminator field in the wire shape
pub const KIND_FIELD: &str = "type";

/// Kind emitted by the widget after every search
pub const SEARCH_METRICS: &str = "searchMetrics";

/// Kind emitted by the widget when a result is activated
pub const RESULT_CLICK: &str = "resultClick";

/// A message as it crosses the isolation boundary, before filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Origin of the sending document
    pub origin: String,
    /// Structured message content, shared by every listener
    pub data: Arc<Value>,
}

impl RawMessage {
    /// Create a raw message
    #[must_use]
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data: Arc::new(data),
        }
    }
}

/// Exact-match filter on the sender origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginFilter {
    trusted_origin: String,
}

impl OriginFilter {
    /// Accept only messages from `trusted_origin`
    #[must_use]
    pub fn new(trusted_origin: impl Into<String>) -> Self {
        Self {
            trusted_origin: trusted_origin.into(),
        }
    }

    /// The configured trusted origin
    #[must_use]
    pub fn trusted_origin(&self) -> &str {
        &self.trusted_origin
    }

    /// Whether `message` came from the trusted origin
    #[must_use]
    pub fn accepts(&self, message: &RawMessage) -> bool {
        message.origin == self.trusted_origin
    }
}

/// Extract the discriminator from a payload.
///
/// A missing, non-string or empty `type` is [`UNKNOWN_KIND`].
#[must_use]
pub fn kind_of(data: &Value) -> &str {
    data.get(KIND_FIELD)
        .and_then(Value::as_str)
        .filter(|kind| !kind.is_empty())
        .unwrap_or(UNKNOWN_KIND)
}

/// One accepted protocol message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturedMessage {
    /// Declared type discriminator, or `"unknown"`
    pub kind: String,
    /// Full raw content as received
    pub payload: Arc<Value>,
    /// Capture-side time of acceptance
    pub observed_at: DateTime<Utc>,
    /// Zero-based receipt index within the armed session
    pub sequence: u64,
}

impl CapturedMessage {
    /// Normalize an accepted raw message
    #[must_use]
    pub fn from_raw(raw: &RawMessage, sequence: u64) -> Self {
        Self::from_payload(Arc::clone(&raw.data), sequence)
    }

    /// Normalize a payload that is already shared
    #[must_use]
    pub fn from_payload(payload: Arc<Value>, sequence: u64) -> Self {
        Self {
            kind: kind_of(&payload).to_string(),
            payload,
            observed_at: Utc::now(),
            sequence,
        }
    }

    /// Whether the message kind equals `kind`
    #[must_use]
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Top-level payload field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// Decode the payload into a typed protocol message
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(self.payload.as_ref())
    }

    /// Partial match: every field of `expected` must be present and equal.
    ///
    /// Objects are compared recursively; any other value must be equal as a
    /// whole. Extra payload fields are ignored.
    #[must_use]
    pub fn matches(&self, expected: &Value) -> bool {
        value_contains(&self.payload, expected)
    }
}

fn value_contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(key, want)| actual.get(key).is_some_and(|got| value_contains(got, want))),
        _ => actual == expected,
    }
}

/// `searchMetrics` payload: emitted after every search attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetrics {
    /// Query string as submitted
    pub query: String,
    /// Number of results rendered
    pub total_results: u64,
}

/// `resultClick` payload: emitted when a result is activated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultClick {
    /// Identifier of the activated result
    pub id: i64,
}

/// The protocol messages the widget is known to emit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WidgetMessage {
    /// Summary of a search
    #[serde(rename = "searchMetrics")]
    SearchMetrics(SearchMetrics),
    /// Activation of a result
    #[serde(rename = "resultClick")]
    ResultClick(ResultClick),
}

impl WidgetMessage {
    /// The discriminator this message serializes with
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SearchMetrics(_) => SEARCH_METRICS,
            Self::ResultClick(_) => RESULT_CLICK,
        }
    }

    /// Wire representation
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
