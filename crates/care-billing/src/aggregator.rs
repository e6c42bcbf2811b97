//! Totals derived from line items.

use care_models::{Item, WorkOrder};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, Result};

/// Monetary totals of a work order, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl Totals {
    /// Writes these totals onto the order's derived fields.
    pub fn apply_to(&self, order: &mut WorkOrder) {
        order.subtotal_cents = self.subtotal_cents;
        order.tax_cents = self.tax_cents;
        order.total_cents = self.total_cents;
    }

    /// Reads the derived fields of an order.
    pub fn of(order: &WorkOrder) -> Self {
        Self {
            subtotal_cents: order.subtotal_cents,
            tax_cents: order.tax_cents,
            total_cents: order.total_cents,
        }
    }
}

/// Amounts contributed by one line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
}

/// Computes work order totals from line items.
pub struct BillingAggregator;

impl BillingAggregator {
    /// Sums every line of `items`.
    ///
    /// Line subtotal is `qty * unit_price_cents` and line tax is
    /// `line_subtotal * tax_rate_pct / 100`, each rounded half-to-even to
    /// whole cents before summing. No items yields all zeros.
    pub fn compute(items: &[Item]) -> Result<Totals> {
        let mut subtotal: i64 = 0;
        let mut tax: i64 = 0;

        for item in items {
            let line = Self::line(item)?;
            subtotal = subtotal
                .checked_add(line.subtotal_cents)
                .ok_or_else(|| BillingError::Overflow("subtotal".to_string()))?;
            tax = tax
                .checked_add(line.tax_cents)
                .ok_or_else(|| BillingError::Overflow("tax".to_string()))?;
        }

        let total = subtotal
            .checked_add(tax)
            .ok_or_else(|| BillingError::Overflow("total".to_string()))?;

        Ok(Totals {
            subtotal_cents: subtotal,
            tax_cents: tax,
            total_cents: total,
        })
    }

    /// Amounts for a single item.
    pub fn line(item: &Item) -> Result<LineAmounts> {
        Self::check(item)?;

        let overflow = || BillingError::Overflow(format!("item {}", item.id));

        let subtotal = item
            .qty
            .checked_mul(Decimal::from(item.unit_price_cents))
            .ok_or_else(overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);

        let tax = subtotal
            .checked_mul(item.tax_rate_pct)
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);

        Ok(LineAmounts {
            subtotal_cents: subtotal.to_i64().ok_or_else(overflow)?,
            tax_cents: tax.to_i64().ok_or_else(overflow)?,
        })
    }

    fn check(item: &Item) -> Result<()> {
        if item.qty <= Decimal::ZERO {
            return Err(BillingError::InvalidQuantity {
                item: item.id,
                qty: item.qty,
            });
        }
        if item.unit_price_cents < 0 {
            return Err(BillingError::NegativePrice {
                item: item.id,
                cents: item.unit_price_cents,
            });
        }
        if item.tax_rate_pct < Decimal::ZERO || item.tax_rate_pct > Decimal::ONE_HUNDRED {
            return Err(BillingError::TaxRateOutOfRange {
                item: item.id,
                rate: item.tax_rate_pct,
            });
        }
        Ok(())
    }
}
