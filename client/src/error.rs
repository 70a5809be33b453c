//! Error types for the Weekly Pomodoros client.
//!
//! [`ClientError`] classifies why a todo mutation did not happen. The cache
//! keeps the typed value for callers that want to tell the cases apart and
//! shows the user a fixed, human-readable message per operation.

use std::fmt;

use thiserror::Error;

use crate::api::ApiError;

/// Why a mutation failed or was never attempted.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The gateway has no todo with this id.
    #[error("todo not found: {0}")]
    NotFound(String),

    /// A local guard refused the mutation before any request was sent.
    #[error("rejected: {0}")]
    ValidationRejected(GuardViolation),

    /// The request did not complete or the gateway answered with an error.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound { id } => Self::NotFound(id),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Calendar-day guard failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardViolation {
    MissingDate,
    PastDate,
    PastTodoModified,
    PastTodoDeleted,
}

impl GuardViolation {
    /// Message shown to the user.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingDate => "Please select a date!",
            Self::PastDate => "Cannot choose a past date!",
            Self::PastTodoModified => "Cannot modify past todos!",
            Self::PastTodoDeleted => "Cannot delete past todos!",
        }
    }
}

impl fmt::Display for GuardViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Which mutation failed, for picking the banner text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Add,
    Update,
    Delete,
}

impl Mutation {
    /// Message shown when the request fails, whatever the cause.
    #[must_use]
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Add => "Failed to add todo.",
            Self::Update => "Failed to update todo.",
            Self::Delete => "Failed to delete todo.",
        }
    }
}
