//! Line item edits.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use care_models::{Item, ItemId, ItemType, WorkOrderId};

use crate::error::{Result, WorkOrderError};

/// Fields of an item to add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub item_type: ItemType,
    #[serde(default)]
    pub sku: Option<String>,
    pub name: String,
    pub qty: Decimal,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub tax_rate_pct: Decimal,
    /// Placed after the last item when absent.
    #[serde(default)]
    pub position: Option<i32>,
}

impl NewItem {
    pub fn new(item_type: ItemType, name: impl Into<String>, qty: Decimal, unit_price_cents: i64) -> Self {
        Self {
            item_type,
            sku: None,
            name: name.into(),
            qty,
            unit_price_cents,
            tax_rate_pct: Decimal::ZERO,
            position: None,
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_tax_rate(mut self, tax_rate_pct: Decimal) -> Self {
        self.tax_rate_pct = tax_rate_pct;
        self
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }
}

/// Fields of an existing item to change. Absent fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default)]
    pub item_type: Option<ItemType>,
    /// `Some(None)` clears the SKU; in JSON that is an explicit `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub sku: Option<Option<String>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub qty: Option<Decimal>,
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    #[serde(default)]
    pub tax_rate_pct: Option<Decimal>,
    #[serde(default)]
    pub position: Option<i32>,
}

/// Deserializes a field that is present, keeping an explicit `null` apart
/// from an absent field.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// One change to a work order's items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ItemEdit {
    Add(NewItem),
    Update { id: ItemId, patch: ItemPatch },
    Remove { id: ItemId },
}

/// Applies `edits` in order to an in-memory copy of an order's items.
pub(crate) fn apply_edits(
    items: &mut Vec<Item>,
    work_order_id: WorkOrderId,
    edits: &[ItemEdit],
    now: DateTime<Utc>,
) -> Result<()> {
    for edit in edits {
        match edit {
            ItemEdit::Add(new) => {
                let position = match new.position {
                    Some(position) => position,
                    None => next_position(items)?,
                };
                let item = Item {
                    id: ItemId::new(),
                    work_order_id,
                    item_type: new.item_type,
                    sku: new.sku.clone(),
                    name: new.name.trim().to_string(),
                    qty: new.qty,
                    unit_price_cents: new.unit_price_cents,
                    tax_rate_pct: new.tax_rate_pct,
                    position,
                    created_at: now,
                    updated_at: now,
                };
                validate_item(&item)?;
                items.push(item);
            }
            ItemEdit::Update { id, patch } => {
                let item = items
                    .iter_mut()
                    .find(|item| item.id == *id)
                    .ok_or(WorkOrderError::ItemNotFound {
                        work_order: work_order_id,
                        item: *id,
                    })?;
                if let Some(item_type) = patch.item_type {
                    item.item_type = item_type;
                }
                if let Some(sku) = &patch.sku {
                    item.sku = sku.clone();
                }
                if let Some(name) = &patch.name {
                    item.name = name.trim().to_string();
                }
                if let Some(qty) = patch.qty {
                    item.qty = qty;
                }
                if let Some(cents) = patch.unit_price_cents {
                    item.unit_price_cents = cents;
                }
                if let Some(rate) = patch.tax_rate_pct {
                    item.tax_rate_pct = rate;
                }
                if let Some(position) = patch.position {
                    item.position = position;
                }
                item.updated_at = now;
                validate_item(item)?;
            }
            ItemEdit::Remove { id } => {
                let before = items.len();
                items.retain(|item| item.id != *id);
                if items.len() == before {
                    return Err(WorkOrderError::ItemNotFound {
                        work_order: work_order_id,
                        item: *id,
                    });
                }
            }
        }
    }

    check_positions(items)
}

fn next_position(items: &[Item]) -> Result<i32> {
    match items.iter().map(|item| item.position).max() {
        Some(last) => last
            .checked_add(1)
            .ok_or_else(|| WorkOrderError::validation("no position left after the last item")),
        None => Ok(1),
    }
}

/// Checks the fields of one item.
pub fn validate_item(item: &Item) -> Result<()> {
    if item.name.trim().is_empty() {
        return Err(WorkOrderError::validation("item name must not be empty"));
    }
    if item.qty <= Decimal::ZERO {
        return Err(WorkOrderError::validation(format!(
            "item quantity must be positive, got {}",
            item.qty
        )));
    }
    if item.unit_price_cents < 0 {
        return Err(WorkOrderError::validation(format!(
            "unit price must not be negative, got {}",
            item.unit_price_cents
        )));
    }
    if item.tax_rate_pct < Decimal::ZERO || item.tax_rate_pct > Decimal::ONE_HUNDRED {
        return Err(WorkOrderError::validation(format!(
            "tax rate must be between 0 and 100, got {}",
            item.tax_rate_pct
        )));
    }
    Ok(())
}

fn check_positions(items: &[Item]) -> Result<()> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.position) {
            return Err(WorkOrderError::validation(format!(
                "duplicate item position {}",
                item.position
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use care_models::ErrorKind;

    fn add(name: &str, qty: i64, cents: i64) -> ItemEdit {
        ItemEdit::Add(NewItem::new(ItemType::Part, name, Decimal::from(qty), cents))
    }

    #[test]
    fn test_add_assigns_next_position() {
        let mut items = Vec::new();
        let order = WorkOrderId::new();

        apply_edits(
            &mut items,
            order,
            &[add("Filter", 1, 900), add("Oil", 5, 700)],
            Utc::now(),
        )
        .unwrap();

        let positions: Vec<i32> = items.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert!(items.iter().all(|i| i.work_order_id == order));
    }

    #[test]
    fn test_update_and_remove() {
        let mut items = Vec::new();
        let order = WorkOrderId::new();
        apply_edits(&mut items, order, &[add("Filter", 1, 900), add("Oil", 5, 700)], Utc::now())
            .unwrap();
        let filter = items[0].id;
        let oil = items[1].id;

        let patch = ItemPatch {
            unit_price_cents: Some(1100),
            ..ItemPatch::default()
        };
        apply_edits(
            &mut items,
            order,
            &[ItemEdit::Update { id: filter, patch }, ItemEdit::Remove { id: oil }],
            Utc::now(),
        )
        .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price_cents, 1100);
    }

    #[test]
    fn test_patch_sets_and_clears_sku() {
        let mut items = Vec::new();
        let order = WorkOrderId::new();
        let filter = NewItem::new(ItemType::Part, "Filter", Decimal::ONE, 900).with_sku("F-100");
        apply_edits(&mut items, order, &[ItemEdit::Add(filter)], Utc::now()).unwrap();
        let id = items[0].id;

        let keep: ItemPatch = serde_json::from_str(r#"{"name": "Oil filter"}"#).unwrap();
        apply_edits(&mut items, order, &[ItemEdit::Update { id, patch: keep }], Utc::now())
            .unwrap();
        assert_eq!(items[0].sku.as_deref(), Some("F-100"));

        let clear: ItemPatch = serde_json::from_str(r#"{"sku": null}"#).unwrap();
        assert_eq!(clear.sku, Some(None));
        apply_edits(&mut items, order, &[ItemEdit::Update { id, patch: clear }], Utc::now())
            .unwrap();
        assert!(items[0].sku.is_none());

        let set = ItemPatch {
            sku: Some(Some("F-200".to_string())),
            ..ItemPatch::default()
        };
        apply_edits(&mut items, order, &[ItemEdit::Update { id, patch: set }], Utc::now())
            .unwrap();
        assert_eq!(items[0].sku.as_deref(), Some("F-200"));
    }

    #[test]
    fn test_swapping_positions_in_one_batch() {
        let mut items = Vec::new();
        let order = WorkOrderId::new();
        apply_edits(&mut items, order, &[add("A", 1, 1), add("B", 1, 1)], Utc::now()).unwrap();
        let (a, b) = (items[0].id, items[1].id);

        let to = |position| ItemPatch {
            position: Some(position),
            ..ItemPatch::default()
        };
        apply_edits(
            &mut items,
            order,
            &[
                ItemEdit::Update { id: a, patch: to(2) },
                ItemEdit::Update { id: b, patch: to(1) },
            ],
            Utc::now(),
        )
        .unwrap();

        assert_eq!(items[0].position, 2);
        assert_eq!(items[1].position, 1);
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let order = WorkOrderId::new();
        let cases = [
            NewItem::new(ItemType::Labor, "Diagnosis", Decimal::ZERO, 100),
            NewItem::new(ItemType::Labor, "Diagnosis", Decimal::ONE, -1),
            NewItem::new(ItemType::Labor, "  ", Decimal::ONE, 100),
            NewItem::new(ItemType::Fee, "Disposal", Decimal::ONE, 100)
                .with_tax_rate(Decimal::from(101)),
        ];

        for new in cases {
            let mut items = Vec::new();
            let err = apply_edits(&mut items, order, &[ItemEdit::Add(new)], Utc::now()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationError);
        }
    }

    #[test]
    fn test_duplicate_position_rejected() {
        let mut items = Vec::new();
        let edits = [
            ItemEdit::Add(NewItem::new(ItemType::Part, "A", Decimal::ONE, 1).with_position(3)),
            ItemEdit::Add(NewItem::new(ItemType::Part, "B", Decimal::ONE, 1).with_position(3)),
        ];
        let err = apply_edits(&mut items, WorkOrderId::new(), &edits, Utc::now()).unwrap_err();
        assert!(matches!(err, WorkOrderError::Validation(_)));
    }

    #[test]
    fn test_missing_item_is_not_found() {
        let mut items = Vec::new();
        let err = apply_edits(
            &mut items,
            WorkOrderId::new(),
            &[ItemEdit::Remove { id: ItemId::new() }],
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_edit_json_form() {
        let edit: ItemEdit = serde_json::from_str(
            r#"{"op": "add", "item_type": "labor", "name": "Brake bleed", "qty": "1.5", "unit_price_cents": 12000}"#,
        )
        .unwrap();
        match edit {
            ItemEdit::Add(new) => {
                assert_eq!(new.qty, Decimal::new(15, 1));
                assert_eq!(new.tax_rate_pct, Decimal::ZERO);
                assert!(new.position.is_none());
            }
            other => panic!("unexpected edit: {:?}", other),
        }
    }
}
