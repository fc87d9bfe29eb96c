//! Broadcast fan-out from the log to subscriber services.
//!
//! This module provides the **broadcast pattern**: every accepted event is
//! pushed to a fixed, pre-configured set of subscribers.
//!
//! ## Delivery Guarantees
//!
//! - **At-most-once**: one attempt per subscriber per event. No retry, no
//!   acknowledgement tracking, no dead-letter queue.
//! - **Isolation**: each subscriber has its own bounded queue and worker task.
//!   A slow or failing subscriber only ever affects itself.
//! - **Per-subscriber order**: a subscriber is sent events in append order.
//!   Nothing is promised across subscribers, and the network may still reorder.
//! - **Invisible to producers**: failures end up in logs and [`DispatchStats`],
//!   never in the result of an append.
//!
//! ```text
//! append ─► EventLog ─► BroadcastDispatcher ─┬─► queue ─► worker ─► posts
//!                                            ├─► queue ─► worker ─► comments
//!                                            ├─► queue ─► worker ─► query
//!                                            └─► queue ─► worker ─► moderation
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use blogbus_events::{Event, EventEnvelope};

pub mod dispatcher;
pub mod http;

pub use dispatcher::{BroadcastDispatcher, DispatchStats, DispatcherConfig, SubscriberStats};
pub use http::HttpSubscriber;

/// Why a single delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("subscriber timed out")]
    Timeout,

    #[error("subscriber unreachable: {0}")]
    Transport(String),

    #[error("subscriber responded with status {status}")]
    Rejected { status: u16 },

    #[error("subscriber misconfigured: {0}")]
    Config(String),
}

/// One destination of the fan-out.
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Stable name used in logs and stats.
    fn name(&self) -> &str;

    /// Make one delivery attempt.
    async fn deliver(&self, event: &EventEnvelope<Event>) -> Result<(), DeliveryError>;
}

/// Hands freshly appended events to the fan-out.
///
/// `publish` must not block and cannot fail: whatever happens to delivery is
/// the broadcaster's business, not the appender's.
pub trait Broadcast: Send + Sync {
    fn publish(&self, event: &EventEnvelope<Event>);
}

impl<B> Broadcast for Arc<B>
where
    B: Broadcast + ?Sized,
{
    fn publish(&self, event: &EventEnvelope<Event>) {
        (**self).publish(event)
    }
}
