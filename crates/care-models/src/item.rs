//! Line item types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{ItemId, WorkOrderId};

/// Kind of billable entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Labor,
    Part,
    Fee,
    Other,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Labor => "labor",
            ItemType::Part => "part",
            ItemType::Fee => "fee",
            ItemType::Other => "other",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "labor" => Ok(ItemType::Labor),
            "part" => Ok(ItemType::Part),
            "fee" => Ok(ItemType::Fee),
            "other" => Ok(ItemType::Other),
            other => Err(format!("unknown item type: {}", other)),
        }
    }
}

/// One billable entry attached to a work order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub work_order_id: WorkOrderId,
    pub item_type: ItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub name: String,
    /// Positive; fractional for labor hours.
    pub qty: Decimal,
    pub unit_price_cents: i64,
    /// Percentage between 0 and 100 inclusive.
    pub tax_rate_pct: Decimal,
    /// Display and print order, unique within the work order.
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_type_parse() {
        for item_type in [ItemType::Labor, ItemType::Part, ItemType::Fee, ItemType::Other] {
            assert_eq!(item_type.as_str().parse::<ItemType>(), Ok(item_type));
        }
        assert!("tire".parse::<ItemType>().is_err());
    }

    #[test]
    fn test_item_json_keeps_decimal_precision() {
        let now = Utc::now();
        let item = Item {
            id: ItemId::new(),
            work_order_id: WorkOrderId::new(),
            item_type: ItemType::Labor,
            sku: None,
            name: "Diagnosis".to_string(),
            qty: Decimal::new(125, 2),
            unit_price_cents: 9000,
            tax_rate_pct: Decimal::new(825, 2),
            position: 1,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["item_type"], "labor");
        assert_eq!(json["qty"], "1.25");
        assert!(json.get("sku").is_none());

        let parsed: Item = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, item);
    }
}
