//! Error types for the phone directory.

use care_models::{ErrorKind, Owner, PhoneNumberId};
use care_persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur in phone directory operations.
#[derive(Error, Debug)]
pub enum PhoneError {
    /// Country code is not 1 to 3 digits, or starts with 0.
    #[error("invalid country code {0:?}")]
    InvalidCountryCode(String),

    /// National number is not 4 to 14 digits after stripping separators.
    #[error("invalid national number {0:?}")]
    InvalidNationalNumber(String),

    /// Country code and national number together exceed E.164's limit.
    #[error("number has {digits} digits, at most 15 allowed")]
    TooLong { digits: usize },

    /// The owner has no link to the phone number.
    #[error("{owner} has no link to phone number {phone_number_id}")]
    LinkNotFound {
        owner: Owner,
        phone_number_id: PhoneNumberId,
    },

    /// A link points at a phone number row that does not exist.
    #[error("linked phone number {0} is missing")]
    MissingPhoneNumber(PhoneNumberId),

    /// Store failure.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl PhoneError {
    /// Classifies this failure for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PhoneError::InvalidCountryCode(_)
            | PhoneError::InvalidNationalNumber(_)
            | PhoneError::TooLong { .. } => ErrorKind::ValidationError,
            PhoneError::LinkNotFound { .. } => ErrorKind::NotFound,
            PhoneError::MissingPhoneNumber(_) => ErrorKind::Internal,
            PhoneError::Persistence(e) => e.kind(),
        }
    }
}

/// Result type alias for phone directory operations.
pub type Result<T> = std::result::Result<T, PhoneError>;

#[cfg(test)]
mod tests {
    use super::*;
    use care_models::UserId;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            PhoneError::InvalidCountryCode("0".into()).kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(
            PhoneError::LinkNotFound {
                owner: Owner::User(UserId::new()),
                phone_number_id: PhoneNumberId::new(),
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PhoneError::from(PersistenceError::Conflict("links".into())).kind(),
            ErrorKind::PersistenceConflict
        );
    }
}
