use std::sync::RwLock;

use chrono::Utc;

use blogbus_events::{Event, EventEnvelope};

use super::r#trait::{EventLog, EventLogError};

/// In-memory append-only event log.
///
/// History lives for the lifetime of the process; durability is out of scope.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<EventEnvelope<Event>>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&self, event: Event) -> Result<EventEnvelope<Event>, EventLogError> {
        let mut events = self.events.write().map_err(|_| EventLogError::Poisoned)?;

        // Positional identity: sequence == index + 1.
        let sequence = events.len() as u64 + 1;
        let stored = EventEnvelope::new(sequence, Utc::now(), event);
        events.push(stored.clone());

        Ok(stored)
    }

    fn list(&self) -> Result<Vec<EventEnvelope<Event>>, EventLogError> {
        let events = self.events.read().map_err(|_| EventLogError::Poisoned)?;
        Ok(events.clone())
    }

    fn list_after(&self, sequence: u64) -> Result<Vec<EventEnvelope<Event>>, EventLogError> {
        let events = self.events.read().map_err(|_| EventLogError::Poisoned)?;
        let start = usize::try_from(sequence).unwrap_or(usize::MAX).min(events.len());
        Ok(events[start..].to_vec())
    }

    fn head(&self) -> Result<u64, EventLogError> {
        let events = self.events.read().map_err(|_| EventLogError::Poisoned)?;
        Ok(events.len() as u64)
    }
}
