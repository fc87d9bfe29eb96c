use serde::{Deserialize, Serialize};

use blogbus_core::PostId;
use blogbus_infra::projections::PostThread;

// -------------------------
// Request DTOs
// -------------------------

/// A missing title is reported by the domain as a validation error.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Only events with a sequence number greater than this.
    pub after: Option<u64>,
}

// -------------------------
// Response DTOs
// -------------------------

/// What the posts service exposes: a post without its comments.
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
}

impl From<PostThread> for PostSummary {
    fn from(thread: PostThread) -> Self {
        Self {
            id: thread.id,
            title: thread.title,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub status: &'static str,
}

impl Ack {
    pub fn new(status: &'static str) -> Self {
        Self { status }
    }
}
