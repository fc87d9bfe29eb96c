//! Wire-level events: the closed kind set, ingestion validation, log envelopes
//! and the projection machinery shared by replay and live handling.

pub mod envelope;
pub mod projection;
pub mod runner;
pub mod schema;

pub use envelope::EventEnvelope;
pub use projection::{Applied, Projection};
pub use runner::{ProjectionRunner, RunOutcome, RunnerError};
pub use schema::{Event, EventKind, Issue, RawEvent, TypedEvent, ValidationError, validate};
