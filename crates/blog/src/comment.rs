use core::fmt;

use serde::{Deserialize, Serialize};

use blogbus_core::{Aggregate, AggregateRoot, CommentId, DomainError, Entity, PostId};

use crate::event::{BlogEvent, CommentCreated, CommentUpdated};

/// Comment moderation lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    #[default]
    #[serde(alias = "Pending")]
    Pending,
    Approved,
    Rejected,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Approved => "approved",
            CommentStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate root: Comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    id: CommentId,
    post_id: Option<PostId>,
    content: String,
    status: CommentStatus,
    version: u64,
    created: bool,
}

impl Comment {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: CommentId) -> Self {
        Self {
            id,
            post_id: None,
            content: String::new(),
            status: CommentStatus::Pending,
            version: 0,
            created: false,
        }
    }

    /// Restore an existing comment from a projected snapshot.
    pub fn restore(
        id: CommentId,
        post_id: PostId,
        content: impl Into<String>,
        status: CommentStatus,
    ) -> Self {
        Self {
            id,
            post_id: Some(post_id),
            content: content.into(),
            status,
            version: 1,
            created: true,
        }
    }

    pub fn post_id(&self) -> Option<&PostId> {
        self.post_id.as_ref()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> CommentStatus {
        self.status
    }
}

impl AggregateRoot for Comment {
    type Id = CommentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateComment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateComment {
    pub id: CommentId,
    pub post_id: PostId,
    pub content: String,
}

/// Command: ApplyModeration.
///
/// Issued by the comments service when it observes a moderation decision; the
/// resulting `commentUpdated` carries the comment's full current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyModeration {
    pub id: CommentId,
    pub post_id: PostId,
    pub status: CommentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentCommand {
    CreateComment(CreateComment),
    ApplyModeration(ApplyModeration),
}

impl Aggregate for Comment {
    type Command = CommentCommand;
    type Event = BlogEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            BlogEvent::CommentCreated(e) if e.id == self.id => {
                self.post_id = Some(e.post_id.clone());
                self.content = e.content.clone();
                self.status = CommentStatus::Pending;
                self.created = true;
            }
            BlogEvent::CommentModerated(e) if e.id == self.id => {
                self.status = e.status;
            }
            BlogEvent::CommentUpdated(e) if e.id == self.id => {
                self.status = e.status;
                self.content = e.content.clone();
            }
            _ => return,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CommentCommand::CreateComment(cmd) => self.handle_create(cmd),
            CommentCommand::ApplyModeration(cmd) => self.handle_moderation(cmd),
        }
    }
}

impl Comment {
    fn handle_create(&self, cmd: &CreateComment) -> Result<Vec<BlogEvent>, DomainError> {
        if cmd.id != self.id {
            return Err(DomainError::mismatch("comment id"));
        }
        if self.created {
            return Err(DomainError::already_exists(Entity::Comment));
        }
        if cmd.content.trim().is_empty() {
            return Err(DomainError::missing("content"));
        }

        Ok(vec![BlogEvent::CommentCreated(CommentCreated {
            id: cmd.id.clone(),
            content: cmd.content.clone(),
            post_id: cmd.post_id.clone(),
            status: CommentStatus::Pending,
        })])
    }

    fn handle_moderation(&self, cmd: &ApplyModeration) -> Result<Vec<BlogEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(Entity::Comment));
        }
        if cmd.id != self.id || self.post_id.as_ref() != Some(&cmd.post_id) {
            return Err(DomainError::mismatch("comment does not belong to post"));
        }

        // Already reflected (duplicate decision): nothing to publish.
        if self.status == cmd.status {
            return Ok(vec![]);
        }

        Ok(vec![BlogEvent::CommentUpdated(CommentUpdated {
            id: cmd.id.clone(),
            content: self.content.clone(),
            post_id: cmd.post_id.clone(),
            status: cmd.status,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CommentModerated;

    fn created_comment() -> Comment {
        let mut comment = Comment::empty(CommentId::from("C1"));
        comment
            .execute(&CommentCommand::CreateComment(CreateComment {
                id: CommentId::from("C1"),
                post_id: PostId::from("P1"),
                content: "nice post".to_string(),
            }))
            .unwrap();
        comment
    }

    fn moderation(status: CommentStatus) -> CommentCommand {
        CommentCommand::ApplyModeration(ApplyModeration {
            id: CommentId::from("C1"),
            post_id: PostId::from("P1"),
            status,
        })
    }

    #[test]
    fn create_comment_starts_pending() {
        let comment = created_comment();
        assert_eq!(comment.status(), CommentStatus::Pending);
        assert_eq!(comment.post_id(), Some(&PostId::from("P1")));
        assert_eq!(comment.version(), 1);
    }

    #[test]
    fn create_comment_requires_content() {
        let comment = Comment::empty(CommentId::from("C1"));
        let err = comment
            .handle(&CommentCommand::CreateComment(CreateComment {
                id: CommentId::from("C1"),
                post_id: PostId::from("P1"),
                content: "".to_string(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::missing("content"));
    }

    #[test]
    fn moderation_becomes_an_update_with_current_content() {
        let comment = created_comment();
        let events = comment.handle(&moderation(CommentStatus::Approved)).unwrap();

        assert_eq!(
            events,
            vec![BlogEvent::CommentUpdated(CommentUpdated {
                id: CommentId::from("C1"),
                content: "nice post".to_string(),
                post_id: PostId::from("P1"),
                status: CommentStatus::Approved,
            })]
        );
    }

    #[test]
    fn repeated_moderation_publishes_nothing() {
        let mut comment = created_comment();
        let events = comment.handle(&moderation(CommentStatus::Rejected)).unwrap();
        comment.apply(&events[0]);

        assert!(comment.handle(&moderation(CommentStatus::Rejected)).unwrap().is_empty());
    }

    #[test]
    fn moderation_of_unknown_comment_is_not_found() {
        let comment = Comment::empty(CommentId::from("C1"));
        assert_eq!(
            comment.handle(&moderation(CommentStatus::Approved)).unwrap_err(),
            DomainError::NotFound(Entity::Comment)
        );
    }

    #[test]
    fn moderation_under_the_wrong_post_is_rejected() {
        let comment = created_comment();
        let cmd = CommentCommand::ApplyModeration(ApplyModeration {
            id: CommentId::from("C1"),
            post_id: PostId::from("P2"),
            status: CommentStatus::Approved,
        });
        assert!(matches!(comment.handle(&cmd), Err(DomainError::Mismatch(_))));
    }

    #[test]
    fn status_accepts_legacy_capitalized_pending() {
        let s: CommentStatus = serde_json::from_str("\"Pending\"").unwrap();
        assert_eq!(s, CommentStatus::Pending);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"pending\"");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn status() -> impl Strategy<Value = CommentStatus> {
            prop_oneof![
                Just(CommentStatus::Pending),
                Just(CommentStatus::Approved),
                Just(CommentStatus::Rejected),
            ]
        }

        proptest! {
            /// Property: Apply is deterministic (same events = same final state).
            #[test]
            fn apply_is_deterministic(
                content in "[a-z ]{1,40}",
                statuses in proptest::collection::vec(status(), 0..8)
            ) {
                let mut events = vec![BlogEvent::CommentCreated(CommentCreated {
                    id: CommentId::from("C1"),
                    content: content.clone(),
                    post_id: PostId::from("P1"),
                    status: CommentStatus::Pending,
                })];
                events.extend(statuses.iter().map(|s| BlogEvent::CommentModerated(CommentModerated {
                    id: CommentId::from("C1"),
                    post_id: PostId::from("P1"),
                    status: *s,
                    content: None,
                })));

                let a = Comment::rehydrate(Comment::empty(CommentId::from("C1")), &events);
                let b = Comment::rehydrate(Comment::empty(CommentId::from("C1")), &events);

                prop_assert_eq!(&a, &b);
                prop_assert_eq!(a.version(), events.len() as u64);
                prop_assert_eq!(a.status(), statuses.last().copied().unwrap_or(CommentStatus::Pending));
            }
        }
    }
}
