//! Billing totals for Engine Care.
//!
//! [`BillingAggregator`] turns a work order's line items into subtotal, tax
//! and total in integer cents. It is a pure function: no store access, no
//! clock, no logging. Every multiplication and sum is checked, so an
//! absurd quantity or price surfaces as a [`BillingError`] instead of a
//! wrapped total.
//!
//! # Example
//!
//! ```no_run
//! use care_billing::BillingAggregator;
//! # let items: Vec<care_models::Item> = Vec::new();
//!
//! let totals = BillingAggregator::compute(&items).unwrap();
//! assert_eq!(totals.total_cents, totals.subtotal_cents + totals.tax_cents);
//! ```

pub mod aggregator;
pub mod error;

pub use aggregator::{BillingAggregator, LineAmounts, Totals};
pub use error::{BillingError, Result};
