//! Typed payloads for every recognized event kind.
//!
//! The bus validates events shallowly; decoding into these shapes happens at
//! the consumer, where a missing field is a recoverable payload error.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use blogbus_core::{CommentId, PostId};
use blogbus_events::{Event, EventKind, TypedEvent};

use crate::comment::CommentStatus;

/// Event: PostCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCreated {
    pub id: PostId,
    pub title: String,
}

/// Event: PostDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDeleted {
    pub id: PostId,
}

/// Event: CommentCreated.
///
/// Producers may send a `status`; projections always start a comment as
/// `pending` regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreated {
    pub id: CommentId,
    pub content: String,
    pub post_id: PostId,
    #[serde(default)]
    pub status: CommentStatus,
}

/// Event: CommentModerated (emitted by the moderation service).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentModerated {
    pub id: CommentId,
    pub post_id: PostId,
    pub status: CommentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Event: CommentUpdated (emitted by the comments service).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentUpdated {
    pub id: CommentId,
    pub content: String,
    pub post_id: PostId,
    pub status: CommentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlogEvent {
    PostCreated(PostCreated),
    PostDeleted(PostDeleted),
    CommentCreated(CommentCreated),
    CommentModerated(CommentModerated),
    CommentUpdated(CommentUpdated),
}

/// A validated event whose `data` does not fit its kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} payload: {reason}")]
pub struct PayloadError {
    pub kind: EventKind,
    pub reason: String,
}

impl BlogEvent {
    /// Decode a validated wire event into its typed payload.
    pub fn decode(event: &Event) -> Result<Self, PayloadError> {
        let kind = event.kind();
        let data = JsonValue::Object(event.data().clone());
        let err = |e: serde_json::Error| PayloadError {
            kind,
            reason: e.to_string(),
        };

        Ok(match kind {
            EventKind::PostCreated => BlogEvent::PostCreated(serde_json::from_value(data).map_err(err)?),
            EventKind::PostDeleted => BlogEvent::PostDeleted(serde_json::from_value(data).map_err(err)?),
            EventKind::CommentCreated => {
                BlogEvent::CommentCreated(serde_json::from_value(data).map_err(err)?)
            }
            EventKind::CommentModerated => {
                BlogEvent::CommentModerated(serde_json::from_value(data).map_err(err)?)
            }
            EventKind::CommentUpdated => {
                BlogEvent::CommentUpdated(serde_json::from_value(data).map_err(err)?)
            }
        })
    }

    /// Post the event belongs to.
    pub fn post_id(&self) -> &PostId {
        match self {
            BlogEvent::PostCreated(e) => &e.id,
            BlogEvent::PostDeleted(e) => &e.id,
            BlogEvent::CommentCreated(e) => &e.post_id,
            BlogEvent::CommentModerated(e) => &e.post_id,
            BlogEvent::CommentUpdated(e) => &e.post_id,
        }
    }
}

impl TypedEvent for BlogEvent {
    fn kind(&self) -> EventKind {
        match self {
            BlogEvent::PostCreated(_) => EventKind::PostCreated,
            BlogEvent::PostDeleted(_) => EventKind::PostDeleted,
            BlogEvent::CommentCreated(_) => EventKind::CommentCreated,
            BlogEvent::CommentModerated(_) => EventKind::CommentModerated,
            BlogEvent::CommentUpdated(_) => EventKind::CommentUpdated,
        }
    }

    fn to_event(&self) -> Event {
        let data = match self {
            BlogEvent::PostCreated(e) => serde_json::to_value(e),
            BlogEvent::PostDeleted(e) => serde_json::to_value(e),
            BlogEvent::CommentCreated(e) => serde_json::to_value(e),
            BlogEvent::CommentModerated(e) => serde_json::to_value(e),
            BlogEvent::CommentUpdated(e) => serde_json::to_value(e),
        };

        // Plain structs of strings always serialize to objects.
        let data = match data {
            Ok(JsonValue::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        Event::new(self.kind(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogbus_events::{RawEvent, validate};
    use serde_json::json;

    fn wire(v: JsonValue) -> Event {
        let raw: RawEvent = serde_json::from_value(v).unwrap();
        validate(&raw).unwrap()
    }

    #[test]
    fn decodes_wire_field_names() {
        let ev = wire(json!({
            "type": "commentCreated",
            "data": {"id": "C1", "content": "hi", "postId": "P1", "status": "pending"}
        }));

        match BlogEvent::decode(&ev).unwrap() {
            BlogEvent::CommentCreated(c) => {
                assert_eq!(c.id, CommentId::from("C1"));
                assert_eq!(c.post_id, PostId::from("P1"));
                assert_eq!(c.content, "hi");
                assert_eq!(c.status, CommentStatus::Pending);
            }
            other => panic!("expected CommentCreated, got {other:?}"),
        }
    }

    #[test]
    fn moderated_content_is_optional() {
        let ev = wire(json!({
            "type": "commentModerated",
            "data": {"id": "C1", "postId": "P1", "status": "approved"}
        }));
        let decoded = BlogEvent::decode(&ev).unwrap();
        assert_eq!(
            decoded,
            BlogEvent::CommentModerated(CommentModerated {
                id: CommentId::from("C1"),
                post_id: PostId::from("P1"),
                status: CommentStatus::Approved,
                content: None,
            })
        );
    }

    #[test]
    fn missing_fields_are_payload_errors() {
        let ev = wire(json!({"type": "postCreated", "data": {"id": "P1"}}));
        let err = BlogEvent::decode(&ev).unwrap_err();
        assert_eq!(err.kind, EventKind::PostCreated);
        assert!(err.reason.contains("title"));
    }

    #[test]
    fn unknown_status_is_a_payload_error() {
        let ev = wire(json!({
            "type": "commentUpdated",
            "data": {"id": "C1", "postId": "P1", "content": "x", "status": "shadowbanned"}
        }));
        assert!(BlogEvent::decode(&ev).is_err());
    }

    #[test]
    fn encoding_uses_wire_names() {
        let ev = BlogEvent::CommentUpdated(CommentUpdated {
            id: CommentId::from("C1"),
            content: "hello".to_string(),
            post_id: PostId::from("P1"),
            status: CommentStatus::Rejected,
        })
        .to_event();

        assert_eq!(ev.kind(), EventKind::CommentUpdated);
        assert_eq!(ev.str_field("postId"), Some("P1"));
        assert_eq!(ev.str_field("status"), Some("rejected"));
        assert_eq!(BlogEvent::decode(&ev).unwrap().post_id(), &PostId::from("P1"));
    }
}
