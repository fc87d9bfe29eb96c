//! Event schema: the closed set of event kinds and ingestion validation.
//!
//! Validation is intentionally **shallow**: it checks kind membership and that
//! `data` is a mapping. Per-kind required fields are checked later, by the
//! projections that decode payloads (and which fail soft on missing fields).

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// The closed set of recognized event kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    PostCreated,
    PostDeleted,
    CommentCreated,
    CommentModerated,
    CommentUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::PostCreated,
        EventKind::PostDeleted,
        EventKind::CommentCreated,
        EventKind::CommentModerated,
        EventKind::CommentUpdated,
    ];

    /// Stable wire name (e.g. `"commentCreated"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PostCreated => "postCreated",
            EventKind::PostDeleted => "postDeleted",
            EventKind::CommentCreated => "commentCreated",
            EventKind::CommentModerated => "commentModerated",
            EventKind::CommentUpdated => "commentUpdated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownKind { kind: s.to_string() })
    }
}

/// An event exactly as received on the wire, before validation.
///
/// `sequence` is only present on events that went through the bus (fan-out
/// and history reads); producers never send it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type", default)]
    pub kind: JsonValue,

    #[serde(default)]
    pub data: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

/// A validated event: recognized kind + keyed payload.
///
/// Immutable once constructed; the log never rewrites events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: EventKind,

    #[serde(default)]
    data: Map<String, JsonValue>,
}

impl Event {
    pub fn new(kind: EventKind, data: Map<String, JsonValue>) -> Self {
        Self { kind, data }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn data(&self) -> &Map<String, JsonValue> {
        &self.data
    }

    /// String field lookup inside `data`.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(JsonValue::as_str)
    }

    /// Wire form used for fan-out: `{ type, data, sequence }`.
    pub fn to_raw(&self, sequence: Option<u64>) -> RawEvent {
        RawEvent {
            kind: JsonValue::String(self.kind.as_str().to_string()),
            data: Some(JsonValue::Object(self.data.clone())),
            sequence,
        }
    }
}

/// A strongly shaped payload for one event kind.
///
/// Domain crates implement this for their event enums so they can be turned
/// back into wire events when a service produces them.
pub trait TypedEvent: Clone + fmt::Debug + Send + Sync + 'static {
    /// The kind this payload is published under.
    fn kind(&self) -> EventKind;

    /// Encode into a validated wire event.
    fn to_event(&self) -> Event;
}

/// A single validation problem, rendered in HTTP error bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub path: String,
    pub message: String,
}

/// Ingestion-time validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("event type is missing or not a string")]
    MissingKind,

    #[error("unknown event type '{kind}'")]
    UnknownKind { kind: String },

    #[error("malformed event data: {reason}")]
    MalformedData { reason: String },
}

impl ValidationError {
    /// Structured issue list for the caller.
    pub fn issues(&self) -> Vec<Issue> {
        let (path, message) = match self {
            ValidationError::MissingKind => ("type", "required string".to_string()),
            ValidationError::UnknownKind { kind } => (
                "type",
                format!(
                    "expected one of {}, received '{kind}'",
                    EventKind::ALL.map(|k| k.as_str()).join(" | ")
                ),
            ),
            ValidationError::MalformedData { reason } => ("data", reason.clone()),
        };
        vec![Issue {
            path: path.to_string(),
            message,
        }]
    }

    /// Whether the only problem is an unrecognized kind.
    ///
    /// Subscribers acknowledge and ignore such events (forward compatibility);
    /// only the bus rejects them.
    pub fn is_unknown_kind(&self) -> bool {
        matches!(self, ValidationError::UnknownKind { .. })
    }
}

/// Validate a raw wire event into an [`Event`].
///
/// An absent or `null` `data` is treated as an empty mapping.
pub fn validate(raw: &RawEvent) -> Result<Event, ValidationError> {
    let kind = match &raw.kind {
        JsonValue::String(s) => s.parse::<EventKind>()?,
        _ => return Err(ValidationError::MissingKind),
    };

    let data = match &raw.data {
        None | Some(JsonValue::Null) => Map::new(),
        Some(JsonValue::Object(map)) => map.clone(),
        Some(other) => {
            return Err(ValidationError::MalformedData {
                reason: format!("expected object, received {}", json_type_name(other)),
            });
        }
    };

    Ok(Event::new(kind, data))
}

fn json_type_name(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
