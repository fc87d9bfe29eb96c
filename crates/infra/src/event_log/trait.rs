use std::sync::Arc;

use thiserror::Error;

use blogbus_events::{Event, EventEnvelope};

/// Event log operation error.
///
/// Appends of validated events never fail for domain reasons; the only failure
/// is an internal one (a writer panicked while holding the lock).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventLogError {
    #[error("event log lock poisoned")]
    Poisoned,
}

/// Append-only, totally ordered event log.
///
/// The `EventLog` owns the canonical history. Every projection in every
/// service is derived from it and can be rebuilt from it.
///
/// ## Ordering
///
/// Events get 1-based, strictly increasing, gap-free sequence numbers in the
/// order they were accepted. Nothing is ever reordered or removed.
///
/// ## Read Semantics
///
/// `list()` returns a consistent prefix: a reader concurrent with appends sees
/// the history as of some length `n`, never a torn view, and two reads at the
/// same length return identical prefixes.
///
/// ## Implementation Requirements
///
/// - Serialize appends (one writer at a time).
/// - Let reads proceed concurrently with each other.
pub trait EventLog: Send + Sync {
    /// Append a validated event; returns it with its assigned sequence number.
    fn append(&self, event: Event) -> Result<EventEnvelope<Event>, EventLogError>;

    /// Full ordered history.
    fn list(&self) -> Result<Vec<EventEnvelope<Event>>, EventLogError>;

    /// Events with a sequence number strictly greater than `sequence`.
    fn list_after(&self, sequence: u64) -> Result<Vec<EventEnvelope<Event>>, EventLogError>;

    /// Sequence number of the last accepted event (0 when empty).
    fn head(&self) -> Result<u64, EventLogError>;
}

impl<L> EventLog for Arc<L>
where
    L: EventLog + ?Sized,
{
    fn append(&self, event: Event) -> Result<EventEnvelope<Event>, EventLogError> {
        (**self).append(event)
    }

    fn list(&self) -> Result<Vec<EventEnvelope<Event>>, EventLogError> {
        (**self).list()
    }

    fn list_after(&self, sequence: u64) -> Result<Vec<EventEnvelope<Event>>, EventLogError> {
        (**self).list_after(sequence)
    }

    fn head(&self) -> Result<u64, EventLogError> {
        (**self).head()
    }
}
