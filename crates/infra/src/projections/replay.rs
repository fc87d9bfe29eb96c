//! Startup replay: rebuild a projection from the bus's full history before
//! serving live traffic.
//!
//! A service that cannot fetch history refuses to start; serving from an empty
//! projection would silently hide every earlier event.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use blogbus_events::{
    Event, EventEnvelope, Projection, ProjectionRunner, RawEvent, RunOutcome, RunnerError,
    validate,
};

use crate::event_log::{EventLog, EventLogError};

/// Counters reported by a bootstrap.
pub type ReplayReport = RunOutcome;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to fetch event history: {0}")]
    Fetch(String),

    #[error(transparent)]
    Log(#[from] EventLogError),

    #[error("history record {index} is invalid: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error(transparent)]
    History(#[from] RunnerError),
}

/// Where a service reads the ordered history from.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_history(&self) -> Result<Vec<EventEnvelope<Event>>, ReplayError>;
}

/// Reads history from `GET {bus}/events`.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpEventSource {
    pub fn new(bus_url: &str, timeout: Duration) -> Result<Self, ReplayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReplayError::Fetch(e.to_string()))?;

        Ok(Self {
            endpoint: format!("{}/events", bus_url.trim_end_matches('/')),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// One entry of `GET /events`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(flatten)]
    pub event: RawEvent,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Turn wire records into log envelopes.
///
/// Records of a kind this build does not know are skipped; a record without a
/// sequence number makes the whole history unusable.
pub fn decode_history(
    records: Vec<HistoryRecord>,
) -> Result<Vec<EventEnvelope<Event>>, ReplayError> {
    let mut history = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let sequence = record.event.sequence.ok_or_else(|| ReplayError::InvalidRecord {
            index,
            reason: "missing sequence".to_string(),
        })?;

        match validate(&record.event) {
            Ok(event) => history.push(EventEnvelope::new(
                sequence,
                record.accepted_at.unwrap_or_else(Utc::now),
                event,
            )),
            Err(err) => warn!(sequence, error = %err, "skipping unusable history record"),
        }
    }

    Ok(history)
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch_history(&self) -> Result<Vec<EventEnvelope<Event>>, ReplayError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| ReplayError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReplayError::Fetch(format!("bus responded with status {status}")));
        }

        let records: Vec<HistoryRecord> = response
            .json()
            .await
            .map_err(|e| ReplayError::Fetch(e.to_string()))?;

        decode_history(records)
    }
}

/// Reads history straight from an in-process log.
#[derive(Debug, Clone)]
pub struct LocalLogSource<L> {
    log: L,
}

impl<L> LocalLogSource<L> {
    pub fn new(log: L) -> Self {
        Self { log }
    }
}

#[async_trait]
impl<L> EventSource for LocalLogSource<L>
where
    L: EventLog,
{
    async fn fetch_history(&self) -> Result<Vec<EventEnvelope<Event>>, ReplayError> {
        Ok(self.log.list()?)
    }
}

#[derive(Debug, Clone)]
pub struct ReplayClient<S> {
    source: S,
}

impl<S> ReplayClient<S>
where
    S: EventSource,
{
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch the full history, then reset and refold the runner's projection.
    ///
    /// Nothing is reset when the fetch fails or the history is out of order.
    pub async fn bootstrap<P>(
        &self,
        runner: &mut ProjectionRunner<P>,
    ) -> Result<ReplayReport, ReplayError>
    where
        P: Projection,
    {
        let history = self.source.fetch_history().await?;
        info!(events = history.len(), "replaying event history");

        let report = runner.rebuild_from_scratch(&history)?;
        info!(
            fetched = report.fetched,
            applied = report.applied,
            unchanged = report.unchanged,
            skipped = report.skipped,
            last_sequence = ?report.last_sequence,
            "replay complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use blogbus_blog::BlogEvent;
    use blogbus_core::PostId;
    use blogbus_events::{Applied, TypedEvent};
    use serde_json::json;

    use super::*;
    use crate::event_log::InMemoryEventLog;
    use crate::projections::BlogProjection;

    fn wire(v: serde_json::Value) -> Event {
        let raw: RawEvent = serde_json::from_value(v).unwrap();
        validate(&raw).unwrap()
    }

    fn seeded_log() -> Arc<InMemoryEventLog> {
        let log = Arc::new(InMemoryEventLog::new());
        for ev in [
            json!({"type": "postCreated", "data": {"id": "P1", "title": "Hello"}}),
            json!({"type": "commentCreated", "data": {"id": "C0", "postId": "NOPE", "content": "x"}}),
            json!({"type": "commentCreated", "data": {"id": "C1", "postId": "P1", "content": "nice"}}),
            json!({"type": "commentModerated", "data": {"id": "C1", "postId": "P1", "status": "approved"}}),
        ] {
            log.append(wire(ev)).unwrap();
        }
        log
    }

    #[tokio::test]
    async fn bootstrap_folds_history_and_sets_the_high_water_mark() {
        let client = ReplayClient::new(LocalLogSource::new(seeded_log()));
        let mut runner = ProjectionRunner::new(BlogProjection::in_memory());

        let report = client.bootstrap(&mut runner).await.unwrap();

        assert_eq!(report.fetched, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.last_sequence, Some(4));
        let comments = runner.projection().comments(&PostId::from("P1")).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].status.as_str(), "approved");
    }

    #[tokio::test]
    async fn live_echo_of_a_replayed_event_is_absorbed() {
        let log = seeded_log();
        let client = ReplayClient::new(LocalLogSource::new(log.clone()));
        let mut runner = ProjectionRunner::new(BlogProjection::in_memory());
        client.bootstrap(&mut runner).await.unwrap();

        let first = log.list().unwrap().remove(0);
        assert_eq!(runner.apply_live(Some(1), first.payload()).unwrap(), Applied::Unchanged);

        let fresh = BlogEvent::decode(&wire(json!({
            "type": "postCreated", "data": {"id": "P2", "title": "Later"}
        })))
        .unwrap();
        assert_eq!(runner.apply_live(Some(5), &fresh.to_event()).unwrap(), Applied::Changed);
        assert_eq!(runner.projection().list().len(), 2);
    }

    #[tokio::test]
    async fn unreachable_bus_is_a_fetch_error() {
        let source = HttpEventSource::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let mut runner = ProjectionRunner::new(BlogProjection::in_memory());

        let err = ReplayClient::new(source).bootstrap(&mut runner).await.unwrap_err();
        assert!(matches!(err, ReplayError::Fetch(_)));
    }

    #[test]
    fn decode_history_skips_unknown_kinds_and_requires_sequences() {
        let records: Vec<HistoryRecord> = serde_json::from_value(json!([
            {"type": "postCreated", "data": {"id": "P1", "title": "T"}, "sequence": 1, "acceptedAt": "2024-01-01T00:00:00Z"},
            {"type": "postArchived", "data": {"id": "P1"}, "sequence": 2},
            {"type": "postDeleted", "data": {"id": "P1"}, "sequence": 3}
        ]))
        .unwrap();

        let history = decode_history(records).unwrap();
        assert_eq!(
            history.iter().map(|e| e.sequence_number()).collect::<Vec<_>>(),
            vec![1, 3]
        );

        let records: Vec<HistoryRecord> =
            serde_json::from_value(json!([{"type": "postDeleted", "data": {"id": "P1"}}])).unwrap();
        assert!(matches!(
            decode_history(records),
            Err(ReplayError::InvalidRecord { index: 0, .. })
        ));
    }
}
