//! Error types for persistence operations.

use std::path::PathBuf;

use care_models::ErrorKind;
use thiserror::Error;

/// Errors that can occur during persistence operations.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to read from file system.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write to file system.
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize data to JSON.
    #[error("failed to serialize: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Failed to create directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Row not found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Another transaction committed a change to data this one read.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// A write would break a unique constraint.
    #[error("unique constraint {constraint} violated by {value}")]
    UniqueViolation {
        constraint: &'static str,
        value: String,
    },

    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl PersistenceError {
    pub(crate) fn not_found(kind: &str, id: impl ToString) -> Self {
        PersistenceError::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Classifies this failure for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PersistenceError::NotFound { .. } => ErrorKind::NotFound,
            PersistenceError::Conflict(_) | PersistenceError::UniqueViolation { .. } => {
                ErrorKind::PersistenceConflict
            }
            _ => ErrorKind::Internal,
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            PersistenceError::Conflict("x".into()).kind(),
            ErrorKind::PersistenceConflict
        );
        assert_eq!(
            PersistenceError::UniqueViolation {
                constraint: "phone_numbers_e164",
                value: "+15551234567".into()
            }
            .kind(),
            ErrorKind::PersistenceConflict
        );
        assert_eq!(
            PersistenceError::not_found("work order", "abc").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PersistenceError::LockPoisoned("boom".into()).kind(),
            ErrorKind::Internal
        );
    }
}
