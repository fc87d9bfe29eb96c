//! `blogbus-moderation`
//!
//! **Responsibility:** comment moderation decisions.
//!
//! This crate holds no state and performs no IO:
//! - it observes `commentCreated` events,
//! - decides `approved` / `rejected` from the content alone,
//! - and returns the derived `commentModerated` event for the caller to publish.

pub mod policy;

pub use policy::{DEFAULT_DISALLOWED_TOKEN, ModerationPolicy};
