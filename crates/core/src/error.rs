//! Domain error model.

use core::fmt;

use thiserror::Error;

/// The kinds of thing a blog command can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Post,
    Comment,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Post => "post",
            Entity::Comment => "comment",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a command was refused.
///
/// Only deterministic outcomes of looking at a command and the current state.
/// Transport and storage failures have their own error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A required text field was absent or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("{0} not found")]
    NotFound(Entity),

    #[error("{0} already exists")]
    AlreadyExists(Entity),

    /// The command addresses a different aggregate (or parent) than the one
    /// it was handed to.
    #[error("mismatch: {0}")]
    Mismatch(String),
}

impl DomainError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField(field)
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(entity: Entity) -> Self {
        Self::NotFound(entity)
    }

    pub fn already_exists(entity: Entity) -> Self {
        Self::AlreadyExists(entity)
    }

    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::Mismatch(msg.into())
    }
}
