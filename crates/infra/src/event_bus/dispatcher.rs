use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use blogbus_events::{Event, EventEnvelope};

use super::{Broadcast, DeliveryError, Subscriber};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Events buffered per subscriber before new ones are dropped for it.
    pub queue_capacity: usize,
    /// Upper bound on a single delivery attempt, whatever the subscriber does.
    pub delivery_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            delivery_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time counters for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberStats {
    pub subscriber: String,
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// Dispatch outcome counters, one set per subscriber.
#[derive(Debug)]
pub struct DispatchStats {
    lanes: Vec<(String, Counters)>,
}

impl DispatchStats {
    pub fn snapshot(&self) -> Vec<SubscriberStats> {
        self.lanes
            .iter()
            .map(|(name, c)| SubscriberStats {
                subscriber: name.clone(),
                delivered: c.delivered.load(Ordering::Relaxed),
                failed: c.failed.load(Ordering::Relaxed),
                dropped: c.dropped.load(Ordering::Relaxed),
            })
            .collect()
    }

    fn counters(&self, lane: usize) -> &Counters {
        &self.lanes[lane].1
    }
}

#[derive(Debug)]
struct Lane {
    name: String,
    tx: mpsc::Sender<EventEnvelope<Event>>,
}

/// Best-effort fan-out to a static subscriber set.
///
/// One FIFO queue and one worker task per subscriber. `publish` only enqueues,
/// so it never waits on the network. After `shutdown` the lane list is empty
/// and further events are not fanned out.
#[derive(Debug)]
pub struct BroadcastDispatcher {
    lanes: RwLock<Vec<Lane>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<DispatchStats>,
}

impl BroadcastDispatcher {
    /// Start one delivery worker per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(subscribers: Vec<Arc<dyn Subscriber>>, config: DispatcherConfig) -> Self {
        let capacity = config.queue_capacity.max(1);
        let stats = Arc::new(DispatchStats {
            lanes: subscribers
                .iter()
                .map(|s| (s.name().to_string(), Counters::default()))
                .collect(),
        });

        let mut lanes = Vec::with_capacity(subscribers.len());
        let mut workers = Vec::with_capacity(subscribers.len());

        for (idx, subscriber) in subscribers.into_iter().enumerate() {
            let (tx, rx) = mpsc::channel(capacity);
            lanes.push(Lane {
                name: subscriber.name().to_string(),
                tx,
            });
            workers.push(tokio::spawn(run_lane(
                idx,
                subscriber,
                rx,
                stats.clone(),
                config.delivery_timeout,
            )));
        }

        info!(subscribers = lanes.len(), queue_capacity = capacity, "broadcast dispatcher started");

        Self {
            lanes: RwLock::new(lanes),
            workers: Mutex::new(workers),
            stats,
        }
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    /// Stop accepting events and wait until every queue is drained.
    ///
    /// Closing the senders lets each worker finish what is already queued and
    /// then exit. Calling it again returns immediately.
    pub async fn shutdown(&self) {
        let closed = std::mem::take(&mut *self.lanes.write().unwrap_or_else(PoisonError::into_inner));
        let queued = closed.len();
        drop(closed);

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        if workers.is_empty() {
            return;
        }
        info!(lanes = queued, "draining dispatch queues");
        for worker in workers {
            if let Err(err) = worker.await {
                warn!(error = %err, "dispatch worker ended abnormally");
            }
        }
        info!("broadcast dispatcher stopped");
    }
}

impl Broadcast for BroadcastDispatcher {
    fn publish(&self, event: &EventEnvelope<Event>) {
        let lanes = self.lanes.read().unwrap_or_else(PoisonError::into_inner);
        if lanes.is_empty() && !self.stats.lanes.is_empty() {
            warn!(sequence = event.sequence_number(), "dispatcher stopped; event not fanned out");
            return;
        }
        for (idx, lane) in lanes.iter().enumerate() {
            let reason = match lane.tx.try_send(event.clone()) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "queue full",
                Err(TrySendError::Closed(_)) => "worker stopped",
            };

            self.stats.counters(idx).dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                subscriber = %lane.name,
                sequence = event.sequence_number(),
                kind = %event.payload().kind(),
                reason,
                "event dropped for subscriber"
            );
        }
    }
}

async fn run_lane(
    idx: usize,
    subscriber: Arc<dyn Subscriber>,
    mut rx: mpsc::Receiver<EventEnvelope<Event>>,
    stats: Arc<DispatchStats>,
    timeout: Duration,
) {
    let counters = stats.counters(idx);

    while let Some(event) = rx.recv().await {
        let outcome = match tokio::time::timeout(timeout, subscriber.deliver(&event)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout),
        };

        match outcome {
            Ok(()) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(subscriber = subscriber.name(), sequence = event.sequence_number(), "event delivered");
            }
            Err(err) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    subscriber = subscriber.name(),
                    sequence = event.sequence_number(),
                    kind = %event.payload().kind(),
                    error = %err,
                    "event delivery failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use blogbus_events::EventKind;
    use chrono::Utc;
    use serde_json::Map;
    use tokio::sync::Semaphore;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        name: String,
        seen: Mutex<Vec<u64>>,
    }

    impl Recorder {
        fn named(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<u64> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Subscriber for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn deliver(&self, event: &EventEnvelope<Event>) -> Result<(), DeliveryError> {
            self.seen.lock().unwrap().push(event.sequence_number());
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Subscriber for AlwaysFails {
        fn name(&self) -> &str {
            "broken"
        }

        async fn deliver(&self, _event: &EventEnvelope<Event>) -> Result<(), DeliveryError> {
            Err(DeliveryError::Transport("connection refused".to_string()))
        }
    }

    struct Hangs;

    #[async_trait]
    impl Subscriber for Hangs {
        fn name(&self) -> &str {
            "hangs"
        }

        async fn deliver(&self, _event: &EventEnvelope<Event>) -> Result<(), DeliveryError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    struct Gated(Arc<Semaphore>);

    #[async_trait]
    impl Subscriber for Gated {
        fn name(&self) -> &str {
            "gated"
        }

        async fn deliver(&self, _event: &EventEnvelope<Event>) -> Result<(), DeliveryError> {
            let _permit = self.0.acquire().await.map_err(|e| DeliveryError::Transport(e.to_string()))?;
            Ok(())
        }
    }

    fn envelope(seq: u64) -> EventEnvelope<Event> {
        EventEnvelope::new(seq, Utc::now(), Event::new(EventKind::PostDeleted, Map::new()))
    }

    fn stats_for<'a>(stats: &'a [SubscriberStats], name: &str) -> &'a SubscriberStats {
        stats.iter().find(|s| s.subscriber == name).unwrap()
    }

    #[tokio::test]
    async fn failing_subscriber_does_not_affect_the_others() {
        let a = Recorder::named("a");
        let b = Recorder::named("b");
        let c = Recorder::named("c");
        let subscribers: Vec<Arc<dyn Subscriber>> =
            vec![a.clone(), Arc::new(AlwaysFails), b.clone(), c.clone()];

        let dispatcher = BroadcastDispatcher::spawn(subscribers, DispatcherConfig::default());
        for seq in 1..=3 {
            dispatcher.publish(&envelope(seq));
        }
        let stats = dispatcher.stats();
        dispatcher.shutdown().await;

        for r in [&a, &b, &c] {
            assert_eq!(r.seen(), vec![1, 2, 3]);
        }
        let snapshot = stats.snapshot();
        assert_eq!(stats_for(&snapshot, "broken").failed, 3);
        assert_eq!(stats_for(&snapshot, "a").delivered, 3);
        assert_eq!(stats_for(&snapshot, "a").failed, 0);
    }

    #[tokio::test]
    async fn hanging_subscriber_is_cut_off_by_the_timeout() {
        let fast = Recorder::named("fast");
        let subscribers: Vec<Arc<dyn Subscriber>> = vec![Arc::new(Hangs), fast.clone()];
        let config = DispatcherConfig {
            delivery_timeout: Duration::from_millis(20),
            ..DispatcherConfig::default()
        };

        let dispatcher = BroadcastDispatcher::spawn(subscribers, config);
        dispatcher.publish(&envelope(1));
        dispatcher.publish(&envelope(2));
        let stats = dispatcher.stats();
        dispatcher.shutdown().await;

        assert_eq!(fast.seen(), vec![1, 2]);
        assert_eq!(stats_for(&stats.snapshot(), "hangs").failed, 2);
    }

    #[tokio::test]
    async fn full_queue_drops_only_for_that_subscriber() {
        let gate = Arc::new(Semaphore::new(0));
        let other = Recorder::named("other");
        let subscribers: Vec<Arc<dyn Subscriber>> = vec![Arc::new(Gated(gate.clone())), other.clone()];
        let config = DispatcherConfig {
            queue_capacity: 1,
            delivery_timeout: Duration::from_secs(30),
        };

        let dispatcher = BroadcastDispatcher::spawn(subscribers, config);
        for seq in 1..=3 {
            dispatcher.publish(&envelope(seq));
            // Let the healthy worker drain its single-slot queue.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let stats = dispatcher.stats();

        let gated = stats_for(&stats.snapshot(), "gated").clone();
        assert!(gated.dropped >= 1, "expected drops for the stalled subscriber: {gated:?}");
        assert_eq!(stats_for(&stats.snapshot(), "other").dropped, 0);

        gate.add_permits(16);
        dispatcher.shutdown().await;

        assert_eq!(other.seen(), vec![1, 2, 3]);
        let gated = stats_for(&stats.snapshot(), "gated").clone();
        assert_eq!(gated.delivered + gated.dropped, 3);
    }

    #[tokio::test]
    async fn shutdown_delivers_what_is_queued_and_stops_fan_out() {
        let slow = Arc::new(Semaphore::new(0));
        let recorder = Recorder::named("recorder");
        let subscribers: Vec<Arc<dyn Subscriber>> = vec![Arc::new(Gated(slow.clone())), recorder.clone()];
        let dispatcher = Arc::new(BroadcastDispatcher::spawn(subscribers, DispatcherConfig::default()));

        for seq in 1..=5 {
            dispatcher.publish(&envelope(seq));
        }
        let stats = dispatcher.stats();

        // Shared handle, as held by the bus's router and log.
        let draining = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.shutdown().await }
        });
        slow.add_permits(16);
        draining.await.unwrap();

        assert_eq!(recorder.seen(), vec![1, 2, 3, 4, 5]);
        assert_eq!(stats_for(&stats.snapshot(), "gated").delivered, 5);

        dispatcher.publish(&envelope(6));
        dispatcher.shutdown().await;
        assert_eq!(recorder.seen(), vec![1, 2, 3, 4, 5]);
    }
}
