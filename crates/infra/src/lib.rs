//! Infrastructure layer: event log, broadcast fan-out, read models and replay.

pub mod event_bus;
pub mod event_log;
pub mod projections;
pub mod read_model;
