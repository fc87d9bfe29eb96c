use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope for an event held by the log.
///
/// This is the unit the log appends and serves for replay.
///
/// Notes:
/// - **Append-only**: `sequence` is the event's 1-based position in the log.
///   It is strictly increasing and gap-free.
/// - `accepted_at` is audit metadata; ordering never depends on it.
/// - The payload is flattened on the wire, so an envelope of [`crate::Event`]
///   serializes as `{ sequence, acceptedAt, type, data }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<E> {
    sequence: u64,
    accepted_at: DateTime<Utc>,

    #[serde(flatten)]
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(sequence: u64, accepted_at: DateTime<Utc>, payload: E) -> Self {
        Self {
            sequence,
            accepted_at,
            payload,
        }
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence
    }

    pub fn accepted_at(&self) -> DateTime<Utc> {
        self.accepted_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, EventKind};
    use serde_json::{Map, json};

    #[test]
    fn serializes_flat() {
        let mut data = Map::new();
        data.insert("id".to_string(), json!("P1"));
        let env = EventEnvelope::new(1, Utc::now(), Event::new(EventKind::PostDeleted, data));

        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["sequence"], 1);
        assert_eq!(json["type"], "postDeleted");
        assert_eq!(json["data"]["id"], "P1");
        assert!(json["acceptedAt"].is_string());

        let back: EventEnvelope<Event> = serde_json::from_value(json).unwrap();
        assert_eq!(back, env);
    }
}
