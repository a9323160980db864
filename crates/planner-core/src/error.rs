//! Error taxonomy shared by every task operation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a task operation.
///
/// Domain failures (`InvalidInput`, `InvalidState`, `NotFound`) are raised
/// before any mutation happens. `Storage` wraps whatever the persistence
/// layer reported, unchanged.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid task state {0:?} (expected pending, in_progress, completed, or failed)")]
    InvalidState(String),

    /// Covers both malformed and out-of-range dotted IDs.
    #[error("task {0:?} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl PlanError {
    pub(crate) fn not_found(id: impl fmt::Display) -> Self {
        Self::NotFound(id.to_string())
    }

    /// The machine-readable kind of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Serializable discriminant of [`PlanError`], reported to callers next to
/// the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    InvalidState,
    NotFound,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidInput => "invalid_input",
            Self::InvalidState => "invalid_state",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
        };
        f.write_str(s)
    }
}
