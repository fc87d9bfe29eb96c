use tracing::debug;

use blogbus_blog::{BlogEvent, CommentModerated, CommentStatus, PayloadError};
use blogbus_events::{Event, EventKind};

/// Token rejected by the default policy.
pub const DEFAULT_DISALLOWED_TOKEN: &str = "orange";

/// Deterministic content rule.
///
/// Model:
/// - A comment is `rejected` iff its content contains any disallowed token
///   (case-sensitive substring match).
/// - Everything else is `approved`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationPolicy {
    disallowed: Vec<String>,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            disallowed: vec![DEFAULT_DISALLOWED_TOKEN.to_string()],
        }
    }
}

impl ModerationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the disallowed token list. Blank tokens are dropped (an empty
    /// token would match every comment).
    pub fn with_disallowed<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallowed = tokens
            .into_iter()
            .map(Into::into)
            .filter(|t| !t.trim().is_empty())
            .collect();
        self
    }

    pub fn disallowed(&self) -> &[String] {
        &self.disallowed
    }

    pub fn decide(&self, content: &str) -> CommentStatus {
        if self.disallowed.iter().any(|t| content.contains(t.as_str())) {
            CommentStatus::Rejected
        } else {
            CommentStatus::Approved
        }
    }

    /// React to an observed event.
    ///
    /// Returns exactly one `commentModerated` for a `commentCreated`, and `None`
    /// for every other kind. A `commentCreated` whose payload cannot be decoded
    /// is an error for the caller to report.
    pub fn react(&self, event: &Event) -> Result<Option<BlogEvent>, PayloadError> {
        if event.kind() != EventKind::CommentCreated {
            return Ok(None);
        }

        let BlogEvent::CommentCreated(created) = BlogEvent::decode(event)? else {
            return Ok(None);
        };

        let status = self.decide(&created.content);
        debug!(comment_id = %created.id, post_id = %created.post_id, %status, "comment moderated");

        Ok(Some(BlogEvent::CommentModerated(CommentModerated {
            id: created.id,
            post_id: created.post_id,
            status,
            content: Some(created.content),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogbus_core::{CommentId, PostId};
    use blogbus_events::{RawEvent, TypedEvent, validate};
    use serde_json::json;

    fn wire(v: serde_json::Value) -> Event {
        let raw: RawEvent = serde_json::from_value(v).unwrap();
        validate(&raw).unwrap()
    }

    #[test]
    fn rejects_content_with_the_default_token() {
        let policy = ModerationPolicy::default();
        assert_eq!(policy.decide("I like orange juice"), CommentStatus::Rejected);
        assert_eq!(policy.decide("I like apple juice"), CommentStatus::Approved);
        // Case-sensitive.
        assert_eq!(policy.decide("ORANGE"), CommentStatus::Approved);
    }

    #[test]
    fn custom_blocklist_drops_blank_tokens() {
        let policy = ModerationPolicy::new().with_disallowed(["spam", " ", ""]);
        assert_eq!(policy.disallowed(), &["spam".to_string()]);
        assert_eq!(policy.decide("buy spam now"), CommentStatus::Rejected);
        assert_eq!(policy.decide("orange"), CommentStatus::Approved);
    }

    #[test]
    fn comment_created_yields_exactly_one_moderated_event() {
        let policy = ModerationPolicy::default();
        let ev = wire(json!({
            "type": "commentCreated",
            "data": {"id": "C1", "content": "orange!", "postId": "P1", "status": "pending"}
        }));

        let out = policy.react(&ev).unwrap().unwrap();
        assert_eq!(
            out,
            BlogEvent::CommentModerated(CommentModerated {
                id: CommentId::from("C1"),
                post_id: PostId::from("P1"),
                status: CommentStatus::Rejected,
                content: Some("orange!".to_string()),
            })
        );
        assert_eq!(out.to_event().kind(), EventKind::CommentModerated);
    }

    #[test]
    fn other_kinds_yield_nothing() {
        let policy = ModerationPolicy::default();
        for ev in [
            wire(json!({"type": "postCreated", "data": {"id": "P1", "title": "orange"}})),
            wire(json!({"type": "commentModerated", "data": {"id": "C1", "postId": "P1", "status": "approved"}})),
            wire(json!({"type": "commentUpdated", "data": {}})),
        ] {
            assert_eq!(policy.react(&ev).unwrap(), None);
        }
    }

    #[test]
    fn malformed_comment_created_is_reported() {
        let policy = ModerationPolicy::default();
        let ev = wire(json!({"type": "commentCreated", "data": {"id": "C1"}}));
        assert!(policy.react(&ev).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: content containing the token is always rejected.
            #[test]
            fn token_means_rejected(prefix in ".{0,30}", suffix in ".{0,30}") {
                let policy = ModerationPolicy::default();
                let content = format!("{prefix}{DEFAULT_DISALLOWED_TOKEN}{suffix}");
                prop_assert_eq!(policy.decide(&content), CommentStatus::Rejected);
            }

            /// Property: content without the token is always approved, and the
            /// decision is stable across calls.
            #[test]
            fn no_token_means_approved(content in "[a-z0-9 ]{0,60}") {
                prop_assume!(!content.contains(DEFAULT_DISALLOWED_TOKEN));
                let policy = ModerationPolicy::default();
                let first = policy.decide(&content);
                prop_assert_eq!(first, CommentStatus::Approved);
                prop_assert_eq!(policy.decide(&content), first);
            }
        }
    }
}
