//! Error types for billing.

use care_models::{ErrorKind, ItemId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while computing totals.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BillingError {
    /// Quantity must be strictly positive.
    #[error("item {item}: quantity must be positive, got {qty}")]
    InvalidQuantity { item: ItemId, qty: Decimal },

    /// Unit price must not be negative.
    #[error("item {item}: unit price must not be negative, got {cents}")]
    NegativePrice { item: ItemId, cents: i64 },

    /// Tax rate must be a percentage between 0 and 100.
    #[error("item {item}: tax rate must be between 0 and 100, got {rate}")]
    TaxRateOutOfRange { item: ItemId, rate: Decimal },

    /// An amount does not fit in 64-bit cents.
    #[error("amount overflow while computing {0}")]
    Overflow(String),
}

impl BillingError {
    /// Billing failures are always caused by the input.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ValidationError
    }
}

/// Result type alias for billing operations.
pub type Result<T> = std::result::Result<T, BillingError>;
