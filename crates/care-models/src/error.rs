//! Error classification shared by every service crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport-neutral category of a failed operation.
///
/// Each service crate has its own error enum; all of them report one of
/// these kinds so a request layer can map failures to status codes without
/// matching on crate-specific variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Referenced entity is absent.
    NotFound,
    /// Status change refused by the state machine.
    InvalidTransition,
    /// Line items edited on a completed or canceled order.
    OrderClosed,
    /// Malformed input.
    ValidationError,
    /// The store could not serialize the transaction; the caller may retry.
    PersistenceConflict,
    /// Unexpected store failure.
    Internal,
}

impl ErrorKind {
    /// Only conflicts are worth retrying, and only at the caller's choice.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::PersistenceConflict)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::OrderClosed => "order_closed",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::PersistenceConflict => "persistence_conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
