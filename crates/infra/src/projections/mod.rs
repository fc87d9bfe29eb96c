//! Projection implementations (read model builders).
//!
//! Projections consume blog events and build the views each service serves.
//! All projections are:
//! - **Rebuildable**: reconstructed from the bus's history on startup
//! - **Idempotent**: safe for duplicate or echoed deliveries

pub mod blog;
pub mod replay;

pub use blog::{BlogProjection, CommentReadModel, InMemoryThreadStore, PostThread, ProjectionError};
pub use replay::{
    EventSource, HistoryRecord, HttpEventSource, LocalLogSource, ReplayClient, ReplayError,
    ReplayReport, decode_history,
};
