use crate::Event;

/// Result of applying one event to a projection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Applied {
    /// State changed.
    Changed,
    /// The event was relevant but already reflected (duplicate delivery).
    Unchanged,
    /// The projection does not react to this kind.
    Ignored,
}

/// A projection builds a local view from the ordered event stream.
///
/// The same `apply` is used for replay at startup and for live delivery, so
/// both paths produce identical state for the same events.
///
/// ## Idempotency
///
/// Delivery is at-most-once per attempt, but the same event can still show up
/// twice (live delivery racing a replay, operator resends). Applying an event a
/// second time must leave state exactly as after the first application.
///
/// ## Errors
///
/// Errors are **recoverable**: the offending event is skipped for this
/// projection only and processing continues with the next event. State must
/// not change when an error is returned.
///
/// ## Disposability
///
/// A projection is never authoritative. `reset` discards everything so it can
/// be rebuilt from the log.
pub trait Projection {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Apply a single event.
    fn apply(&mut self, event: &Event) -> Result<Applied, Self::Error>;

    /// Drop all projected state (rebuild support).
    fn reset(&mut self);
}
