//! Blog projection: one thread per post, holding the post and its comments.
//!
//! Every service that keeps state (posts, comments, query) folds the same
//! events through this reducer, during replay and on live delivery alike.
//! All transitions are idempotent, so a duplicate delivery or a replayed
//! event that is echoed live again never changes the result.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use blogbus_blog::{BlogEvent, CommentStatus, PayloadError};
use blogbus_core::{CommentId, PostId};
use blogbus_events::{Applied, Event, Projection};

use crate::read_model::{AggregateStore, InMemoryAggregateStore};

/// Read model: a comment as seen under its post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentReadModel {
    pub id: CommentId,
    pub content: String,
    pub status: CommentStatus,
    pub post_id: PostId,
}

/// Read model: a post plus its comments in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostThread {
    pub id: PostId,
    pub title: String,
    pub comments: Vec<CommentReadModel>,
}

impl PostThread {
    pub fn new(id: PostId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            comments: Vec::new(),
        }
    }

    pub fn comment(&self, id: &CommentId) -> Option<&CommentReadModel> {
        self.comments.iter().find(|c| &c.id == id)
    }

    fn comment_mut(&mut self, id: &CommentId) -> Option<&mut CommentReadModel> {
        self.comments.iter_mut().find(|c| &c.id == id)
    }
}

/// Recoverable per-event projection failure. The event is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("unknown post {post_id}")]
    UnknownPost { post_id: PostId },

    #[error("unknown comment {comment_id} under post {post_id}")]
    UnknownComment { post_id: PostId, comment_id: CommentId },
}

pub type InMemoryThreadStore = InMemoryAggregateStore<PostId, PostThread>;

#[derive(Debug, Clone)]
pub struct BlogProjection<S = Arc<InMemoryThreadStore>> {
    store: S,
}

impl BlogProjection {
    /// Projection over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryThreadStore::new()))
    }
}

impl<S> BlogProjection<S>
where
    S: AggregateStore<PostId, PostThread>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get(&self, post_id: &PostId) -> Option<PostThread> {
        self.store.get(post_id)
    }

    pub fn list(&self) -> Vec<PostThread> {
        self.store.list()
    }

    /// Comments under a post, or `None` if the post is unknown.
    pub fn comments(&self, post_id: &PostId) -> Option<Vec<CommentReadModel>> {
        self.store.get(post_id).map(|t| t.comments)
    }

    /// Fold one typed event into the store.
    pub fn reduce(&self, event: &BlogEvent) -> Result<Applied, ProjectionError> {
        match event {
            BlogEvent::PostCreated(e) => {
                // First write wins; an existing thread keeps its comments.
                if self.store.get(&e.id).is_some() {
                    return Ok(Applied::Unchanged);
                }
                self.store.upsert(e.id.clone(), PostThread::new(e.id.clone(), e.title.clone()));
                Ok(Applied::Changed)
            }

            BlogEvent::PostDeleted(e) => Ok(match self.store.delete(&e.id) {
                Some(_) => Applied::Changed,
                None => Applied::Unchanged,
            }),

            BlogEvent::CommentCreated(e) => {
                let mut thread = self.thread(&e.post_id)?;
                if thread.comment(&e.id).is_some() {
                    return Ok(Applied::Unchanged);
                }

                thread.comments.push(CommentReadModel {
                    id: e.id.clone(),
                    content: e.content.clone(),
                    status: CommentStatus::Pending,
                    post_id: e.post_id.clone(),
                });
                self.store.upsert(e.post_id.clone(), thread);
                Ok(Applied::Changed)
            }

            BlogEvent::CommentModerated(e) => {
                self.update_comment(&e.post_id, &e.id, |c| {
                    if c.status == e.status {
                        return false;
                    }
                    c.status = e.status;
                    true
                })
            }

            BlogEvent::CommentUpdated(e) => {
                self.update_comment(&e.post_id, &e.id, |c| {
                    if c.status == e.status && c.content == e.content {
                        return false;
                    }
                    c.status = e.status;
                    c.content = e.content.clone();
                    true
                })
            }
        }
    }

    fn thread(&self, post_id: &PostId) -> Result<PostThread, ProjectionError> {
        self.store.get(post_id).ok_or_else(|| ProjectionError::UnknownPost {
            post_id: post_id.clone(),
        })
    }

    fn update_comment(
        &self,
        post_id: &PostId,
        comment_id: &CommentId,
        change: impl FnOnce(&mut CommentReadModel) -> bool,
    ) -> Result<Applied, ProjectionError> {
        let mut thread = self.thread(post_id)?;
        let comment = thread.comment_mut(comment_id).ok_or_else(|| ProjectionError::UnknownComment {
            post_id: post_id.clone(),
            comment_id: comment_id.clone(),
        })?;

        if !change(comment) {
            return Ok(Applied::Unchanged);
        }

        self.store.upsert(post_id.clone(), thread);
        Ok(Applied::Changed)
    }
}

impl<S> Projection for BlogProjection<S>
where
    S: AggregateStore<PostId, PostThread>,
{
    type Error = ProjectionError;

    fn apply(&mut self, event: &Event) -> Result<Applied, Self::Error> {
        let typed = BlogEvent::decode(event)?;
        let applied = self.reduce(&typed)?;
        debug!(kind = %event.kind(), post_id = %typed.post_id(), ?applied, "blog projection applied event");
        Ok(applied)
    }

    fn reset(&mut self) {
        self.store.clear();
    }
}
