//! Service wiring: what each kind of process holds in memory and how it
//! reacts to commands and deliveries.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use blogbus_blog::{
    ApplyModeration, BlogEvent, Comment, CommentCommand, CommentModerated, CreateComment,
    CreatePost, DeletePost, Post, PostCommand,
};
use blogbus_core::{Aggregate, AggregateRoot, CommentId, DomainError, Entity, PostId};
use blogbus_events::{Applied, Event, EventKind, ProjectionRunner, TypedEvent};
use blogbus_infra::event_bus::{
    BroadcastDispatcher, DeliveryError, DispatcherConfig, HttpSubscriber, Subscriber,
};
use blogbus_infra::event_log::{InMemoryEventLog, PublishingEventLog};
use blogbus_infra::projections::{
    BlogProjection, CommentReadModel, EventSource, HttpEventSource, ProjectionError, ReplayClient,
    ReplayError, ReplayReport,
};
use blogbus_moderation::ModerationPolicy;

use crate::app::event_api::{EventApi, PublishError};
use crate::config::{ServiceConfig, ServiceKind};

/// Reasons a service refuses to start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("subscriber {name} cannot be configured: {source}")]
    Subscriber {
        name: String,
        #[source]
        source: DeliveryError,
    },

    #[error("startup replay failed: {0}")]
    Replay(#[from] ReplayError),

    #[error("bus client cannot be configured: {0}")]
    EventApi(#[from] PublishError),
}

/// A command rejected by the domain, or accepted but not published.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

// -------------------------
// Bus
// -------------------------

pub type BusLog = PublishingEventLog<InMemoryEventLog, Arc<BroadcastDispatcher>>;

#[derive(Debug)]
pub struct BusServices {
    pub log: BusLog,
    pub dispatcher: Arc<BroadcastDispatcher>,
}

impl BusServices {
    /// Must be called from within a tokio runtime (spawns dispatch workers).
    pub fn build(config: &ServiceConfig) -> Result<Self, StartupError> {
        let mut subscribers: Vec<Arc<dyn Subscriber>> = Vec::with_capacity(config.subscribers.len());
        for target in &config.subscribers {
            let subscriber = HttpSubscriber::new(&target.name, &target.url, config.dispatch_timeout)
                .map_err(|source| StartupError::Subscriber {
                    name: target.name.clone(),
                    source,
                })?;
            info!(subscriber = %target.name, endpoint = subscriber.endpoint(), "subscriber registered");
            subscribers.push(Arc::new(subscriber));
        }

        let dispatcher = Arc::new(BroadcastDispatcher::spawn(
            subscribers,
            DispatcherConfig {
                queue_capacity: config.dispatch_queue_capacity,
                delivery_timeout: config.dispatch_timeout,
            },
        ));

        Ok(Self {
            log: PublishingEventLog::new(InMemoryEventLog::new(), dispatcher.clone()),
            dispatcher,
        })
    }
}

// -------------------------
// Posts / comments / query
// -------------------------

/// What happened to one live delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receipt {
    Applied(Applied),
    /// No change, and the sequence number lies inside the range the startup
    /// replay folded: most likely an echo of history.
    Replayed,
    /// Recoverable projection error; the event was skipped.
    Skipped(ProjectionError),
}

impl Receipt {
    pub fn as_str(&self) -> &'static str {
        match self {
            Receipt::Applied(Applied::Changed) => "applied",
            Receipt::Applied(Applied::Unchanged) => "unchanged",
            Receipt::Applied(Applied::Ignored) => "ignored",
            Receipt::Replayed => "replayed",
            Receipt::Skipped(_) => "skipped",
        }
    }
}

/// State and behavior of a service that owns a blog projection.
///
/// The runner is the only writer; HTTP reads go through `view`, which shares
/// the runner's store.
#[derive(Debug)]
pub struct BlogServices {
    kind: ServiceKind,
    runner: Mutex<ProjectionRunner<BlogProjection>>,
    view: BlogProjection,
    events: EventApi,
    replay: ReplayReport,
}

impl BlogServices {
    /// Replay the bus's history, then get ready for live traffic.
    pub async fn bootstrap(config: &ServiceConfig) -> Result<Self, StartupError> {
        let source = HttpEventSource::new(&config.event_api, config.replay_timeout)?;
        Self::bootstrap_from(config, source).await
    }

    pub async fn bootstrap_from<S>(config: &ServiceConfig, source: S) -> Result<Self, StartupError>
    where
        S: EventSource,
    {
        let view = BlogProjection::in_memory();
        let mut runner = ProjectionRunner::new(view.clone());
        let replay = ReplayClient::new(source).bootstrap(&mut runner).await?;
        info!(service = %config.kind, posts = view.list().len(), "projection ready");

        Ok(Self {
            kind: config.kind,
            runner: Mutex::new(runner),
            view,
            events: EventApi::new(&config.event_api, config.dispatch_timeout)?,
            replay,
        })
    }

    pub fn view(&self) -> &BlogProjection {
        &self.view
    }

    pub fn replay_report(&self) -> ReplayReport {
        self.replay
    }

    /// Fold a delivery from the bus, then run this service's reactions.
    pub async fn receive(&self, sequence: Option<u64>, event: &Event) -> Receipt {
        let (receipt, moderated) = {
            let mut runner = self.runner.lock().await;
            let moderated = self.moderation_context(event);
            let receipt = match runner.apply_live(sequence, event) {
                Ok(Applied::Unchanged) if runner.covered_by_replay(sequence) => Receipt::Replayed,
                Ok(applied) => Receipt::Applied(applied),
                Err(err) => {
                    warn!(service = %self.kind, ?sequence, kind = %event.kind(), error = %err, "projection skipped event");
                    Receipt::Skipped(err)
                }
            };
            (receipt, moderated)
        };

        if let (Receipt::Applied(_), Some((decision, before))) = (&receipt, moderated) {
            self.follow_up_moderation(&decision, before.as_ref()).await;
        }

        receipt
    }

    /// The comments service answers a moderation decision with the comment's
    /// final state. Captured before the decision is folded.
    fn moderation_context(&self, event: &Event) -> Option<(CommentModerated, Option<CommentReadModel>)> {
        if self.kind != ServiceKind::Comments || event.kind() != EventKind::CommentModerated {
            return None;
        }
        let BlogEvent::CommentModerated(decision) = BlogEvent::decode(event).ok()? else {
            return None;
        };
        let before = self
            .view
            .get(&decision.post_id)
            .and_then(|t| t.comment(&decision.id).cloned());
        Some((decision, before))
    }

    async fn follow_up_moderation(&self, decision: &CommentModerated, before: Option<&CommentReadModel>) {
        let events = match moderation_follow_up(decision, before) {
            Ok(events) => events,
            Err(err) => {
                warn!(comment_id = %decision.id, post_id = %decision.post_id, error = %err, "cannot apply moderation decision");
                return;
            }
        };

        for event in events {
            if let Err(err) = self.publish(&event).await {
                warn!(comment_id = %decision.id, kind = %event.kind(), error = %err, "failed to publish moderation follow-up");
            }
        }
    }

    /// Publish to the bus, then fold locally without waiting for the echo.
    async fn publish(&self, event: &BlogEvent) -> Result<u64, PublishError> {
        let wire = event.to_event();
        let sequence = self.events.publish(&wire).await?;

        let mut runner = self.runner.lock().await;
        if let Err(err) = runner.apply_live(Some(sequence), &wire) {
            warn!(sequence, kind = %wire.kind(), error = %err, "local projection rejected own event");
        }
        Ok(sequence)
    }

    pub async fn create_post(&self, title: String) -> Result<PostId, CommandError> {
        let id = PostId::generate();
        let events = Post::empty(id.clone()).handle(&PostCommand::CreatePost(CreatePost {
            id: id.clone(),
            title,
        }))?;

        for event in &events {
            self.publish(event).await?;
        }
        Ok(id)
    }

    pub async fn delete_post(&self, id: PostId) -> Result<(), CommandError> {
        let post = match self.view.get(&id) {
            Some(thread) => Post::restore(thread.id, thread.title),
            None => Post::empty(id.clone()),
        };
        let events = post.handle(&PostCommand::DeletePost(DeletePost { id }))?;

        for event in &events {
            self.publish(event).await?;
        }
        Ok(())
    }

    pub async fn create_comment(
        &self,
        post_id: PostId,
        content: String,
    ) -> Result<CommentReadModel, CommandError> {
        if self.view.get(&post_id).is_none() {
            return Err(DomainError::not_found(Entity::Post).into());
        }

        let mut comment = Comment::empty(CommentId::generate());
        let events = comment.execute(&CommentCommand::CreateComment(CreateComment {
            id: comment.id().clone(),
            post_id: post_id.clone(),
            content,
        }))?;

        for event in &events {
            self.publish(event).await?;
        }

        // The comment as created; moderation may already be on its way.
        Ok(CommentReadModel {
            id: comment.id().clone(),
            content: comment.content().to_string(),
            status: comment.status(),
            post_id,
        })
    }
}

/// Events the comments service publishes in answer to a moderation decision.
pub fn moderation_follow_up(
    decision: &CommentModerated,
    before: Option<&CommentReadModel>,
) -> Result<Vec<BlogEvent>, DomainError> {
    let comment = match before {
        Some(c) => Comment::restore(c.id.clone(), c.post_id.clone(), c.content.clone(), c.status),
        None => Comment::empty(decision.id.clone()),
    };

    comment.handle(&CommentCommand::ApplyModeration(ApplyModeration {
        id: decision.id.clone(),
        post_id: decision.post_id.clone(),
        status: decision.status,
    }))
}

// -------------------------
// Moderation
// -------------------------

#[derive(Debug)]
pub struct ModerationServices {
    policy: ModerationPolicy,
    events: EventApi,
}

/// Outcome of one delivery to the moderation service.
#[derive(Debug)]
pub enum Verdict {
    Published { sequence: u64 },
    NotApplicable,
}

impl ModerationServices {
    pub fn build(config: &ServiceConfig) -> Result<Self, StartupError> {
        let policy = ModerationPolicy::new().with_disallowed(config.moderation_blocklist.iter().cloned());
        info!(disallowed = ?policy.disallowed(), "moderation policy loaded");

        Ok(Self {
            policy,
            events: EventApi::new(&config.event_api, config.dispatch_timeout)?,
        })
    }

    pub async fn receive(&self, event: &Event) -> Result<Verdict, PublishError> {
        let reaction = match self.policy.react(event) {
            Ok(Some(reaction)) => reaction,
            Ok(None) => return Ok(Verdict::NotApplicable),
            Err(err) => {
                warn!(error = %err, "cannot moderate malformed comment");
                return Ok(Verdict::NotApplicable);
            }
        };

        let sequence = self.events.publish(&reaction.to_event()).await?;
        Ok(Verdict::Published { sequence })
    }
}

#[cfg(test)]
mod tests {
    use blogbus_blog::CommentStatus;

    use super::*;

    fn decision(status: CommentStatus) -> CommentModerated {
        CommentModerated {
            id: CommentId::from("C1"),
            post_id: PostId::from("P1"),
            status,
            content: Some("ignored".to_string()),
        }
    }

    fn pending() -> CommentReadModel {
        CommentReadModel {
            id: CommentId::from("C1"),
            content: "hello".to_string(),
            status: CommentStatus::Pending,
            post_id: PostId::from("P1"),
        }
    }

    #[test]
    fn moderation_follow_up_carries_the_stored_content() {
        let events = moderation_follow_up(&decision(CommentStatus::Approved), Some(&pending())).unwrap();
        match events.as_slice() {
            [BlogEvent::CommentUpdated(u)] => {
                assert_eq!(u.content, "hello");
                assert_eq!(u.status, CommentStatus::Approved);
            }
            other => panic!("unexpected follow-up: {other:?}"),
        }
    }

    #[test]
    fn repeated_decision_has_no_follow_up() {
        let mut approved = pending();
        approved.status = CommentStatus::Approved;
        assert!(moderation_follow_up(&decision(CommentStatus::Approved), Some(&approved))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn decision_for_an_unknown_comment_is_not_found() {
        assert_eq!(
            moderation_follow_up(&decision(CommentStatus::Rejected), None).unwrap_err(),
            DomainError::NotFound(Entity::Comment)
        );
    }
}
