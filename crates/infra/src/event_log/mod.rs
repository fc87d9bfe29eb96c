//! The bus's event log and the append path that feeds the fan-out.

pub mod in_memory;
pub mod r#trait;

use std::sync::Mutex;

use tracing::info;

use blogbus_events::{Event, EventEnvelope};

use crate::event_bus::Broadcast;

pub use in_memory::InMemoryEventLog;
pub use r#trait::{EventLog, EventLogError};

/// An event log that hands every accepted event to a broadcaster.
///
/// Append and publish happen under one gate, so the broadcaster sees events in
/// exactly the order their sequence numbers were assigned. `publish` only
/// enqueues, so holding the gate across it never waits on a subscriber.
#[derive(Debug)]
pub struct PublishingEventLog<L, B> {
    log: L,
    bus: B,
    gate: Mutex<()>,
}

impl<L, B> PublishingEventLog<L, B>
where
    L: EventLog,
    B: Broadcast,
{
    pub fn new(log: L, bus: B) -> Self {
        Self {
            log,
            bus,
            gate: Mutex::new(()),
        }
    }
}

impl<L, B> EventLog for PublishingEventLog<L, B>
where
    L: EventLog,
    B: Broadcast,
{
    fn append(&self, event: Event) -> Result<EventEnvelope<Event>, EventLogError> {
        let _gate = self.gate.lock().map_err(|_| EventLogError::Poisoned)?;

        let stored = self.log.append(event)?;
        info!(sequence = stored.sequence_number(), kind = %stored.payload().kind(), "event appended");
        self.bus.publish(&stored);

        Ok(stored)
    }

    fn list(&self) -> Result<Vec<EventEnvelope<Event>>, EventLogError> {
        self.log.list()
    }

    fn list_after(&self, sequence: u64) -> Result<Vec<EventEnvelope<Event>>, EventLogError> {
        self.log.list_after(sequence)
    }

    fn head(&self) -> Result<u64, EventLogError> {
        self.log.head()
    }
}
