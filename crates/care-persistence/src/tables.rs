//! Row storage shared by the committed state and transaction working copies.

use std::collections::{BTreeMap, HashMap};

use care_models::{
    Event, Item, ItemId, LinkId, Owner, OwnerPhoneLink, PhoneNumber, PhoneNumberId, WorkOrder,
    WorkOrderId,
};
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, Result};

/// A unit of conflict detection.
///
/// Point reads lock a single row; predicate reads (all items of an order,
/// all links of an owner, the list of orders) lock the whole set so that an
/// insert into the set by another transaction is also detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum RowKey {
    WorkOrder(WorkOrderId),
    OrderIndex,
    OrderItems(WorkOrderId),
    OrderEvents(WorkOrderId),
    Phone(String),
    OwnerLinks(Owner),
}

/// A staged write, replayed against the committed tables at commit.
#[derive(Debug, Clone)]
pub(crate) enum Write {
    InsertWorkOrder(WorkOrder),
    UpdateWorkOrder(WorkOrder),
    PutItem(Item),
    DeleteItem {
        id: ItemId,
        work_order_id: WorkOrderId,
    },
    AppendEvent(Event),
    /// `resolved` is the row the upsert landed on in the working copy.
    UpsertPhone {
        phone: PhoneNumber,
        resolved: PhoneNumberId,
    },
    PutLink(OwnerPhoneLink),
    DeleteLink {
        id: LinkId,
        owner: Owner,
    },
}

impl Write {
    /// Keys whose version moves when this write commits.
    pub(crate) fn touched(&self) -> Vec<RowKey> {
        match self {
            Write::InsertWorkOrder(order) | Write::UpdateWorkOrder(order) => {
                vec![RowKey::WorkOrder(order.id), RowKey::OrderIndex]
            }
            Write::PutItem(item) => vec![RowKey::OrderItems(item.work_order_id)],
            Write::DeleteItem { work_order_id, .. } => vec![RowKey::OrderItems(*work_order_id)],
            Write::AppendEvent(event) => vec![RowKey::OrderEvents(event.work_order_id)],
            Write::UpsertPhone { phone, .. } => vec![RowKey::Phone(phone.e164.clone())],
            Write::PutLink(link) => vec![RowKey::OwnerLinks(link.owner)],
            Write::DeleteLink { owner, .. } => vec![RowKey::OwnerLinks(*owner)],
        }
    }
}

/// On-disk form of the tables.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(default)]
    work_orders: Vec<WorkOrder>,
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    events: Vec<Event>,
    #[serde(default)]
    phone_numbers: Vec<PhoneNumber>,
    #[serde(default)]
    links: Vec<OwnerPhoneLink>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    work_orders: BTreeMap<WorkOrderId, WorkOrder>,
    items: BTreeMap<ItemId, Item>,
    events: Vec<Event>,
    phone_numbers: BTreeMap<PhoneNumberId, PhoneNumber>,
    e164_index: BTreeMap<String, PhoneNumberId>,
    links: Vec<OwnerPhoneLink>,
    versions: HashMap<RowKey, u64>,
    commit_seq: u64,
}

impl Tables {
    pub(crate) fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut tables = Tables {
            work_orders: snapshot
                .work_orders
                .into_iter()
                .map(|order| (order.id, order))
                .collect(),
            items: snapshot
                .items
                .into_iter()
                .map(|item| (item.id, item))
                .collect(),
            events: snapshot.events,
            links: snapshot.links,
            ..Tables::default()
        };
        for phone in snapshot.phone_numbers {
            tables.e164_index.insert(phone.e164.clone(), phone.id);
            tables.phone_numbers.insert(phone.id, phone);
        }
        tables
    }

    pub(crate) fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            work_orders: self.work_orders.values().cloned().collect(),
            items: self.items.values().cloned().collect(),
            events: self.events.clone(),
            phone_numbers: self.phone_numbers.values().cloned().collect(),
            links: self.links.clone(),
        }
    }

    /// Version of a key; keys never written are at version 0.
    pub(crate) fn version(&self, key: &RowKey) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    /// Bumps the version of every key the writes touched.
    pub(crate) fn stamp(&mut self, writes: &[Write]) -> u64 {
        self.commit_seq += 1;
        let seq = self.commit_seq;
        for write in writes {
            for key in write.touched() {
                self.versions.insert(key, seq);
            }
        }
        seq
    }

    // Reads

    pub(crate) fn work_order(&self, id: WorkOrderId) -> Option<&WorkOrder> {
        self.work_orders.get(&id)
    }

    pub(crate) fn work_orders(&self) -> impl Iterator<Item = &WorkOrder> {
        self.work_orders.values()
    }

    pub(crate) fn items_of(&self, work_order_id: WorkOrderId) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .items
            .values()
            .filter(|item| item.work_order_id == work_order_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.position);
        items
    }

    pub(crate) fn events_of(&self, work_order_id: WorkOrderId) -> Vec<Event> {
        self.events
            .iter()
            .filter(|event| event.work_order_id == work_order_id)
            .cloned()
            .collect()
    }

    pub(crate) fn phone_number(&self, id: PhoneNumberId) -> Option<&PhoneNumber> {
        self.phone_numbers.get(&id)
    }

    pub(crate) fn phone_by_e164(&self, e164: &str) -> Option<&PhoneNumber> {
        self.e164_index
            .get(e164)
            .and_then(|id| self.phone_numbers.get(id))
    }

    pub(crate) fn links_of(&self, owner: Owner) -> Vec<OwnerPhoneLink> {
        self.links
            .iter()
            .filter(|link| link.owner == owner)
            .cloned()
            .collect()
    }

    // Writes

    /// Applies one write, enforcing keys and foreign references.
    ///
    /// On error the tables are left as they were before the call.
    pub(crate) fn apply(&mut self, write: &Write) -> Result<()> {
        match write {
            Write::InsertWorkOrder(order) => {
                if self.work_orders.contains_key(&order.id) {
                    return Err(PersistenceError::UniqueViolation {
                        constraint: "work_orders_pkey",
                        value: order.id.to_string(),
                    });
                }
                self.work_orders.insert(order.id, order.clone());
            }
            Write::UpdateWorkOrder(order) => match self.work_orders.get_mut(&order.id) {
                Some(row) => *row = order.clone(),
                None => return Err(PersistenceError::not_found("work order", order.id)),
            },
            Write::PutItem(item) => {
                self.require_order(item.work_order_id)?;
                let clash = self.items.values().any(|other| {
                    other.id != item.id
                        && other.work_order_id == item.work_order_id
                        && other.position == item.position
                });
                if clash {
                    return Err(PersistenceError::UniqueViolation {
                        constraint: "work_order_items_position",
                        value: item.position.to_string(),
                    });
                }
                self.items.insert(item.id, item.clone());
            }
            Write::DeleteItem { id, work_order_id } => {
                let owned = self
                    .items
                    .get(id)
                    .is_some_and(|item| item.work_order_id == *work_order_id);
                if !owned {
                    return Err(PersistenceError::not_found("item", id));
                }
                self.items.remove(id);
            }
            Write::AppendEvent(event) => {
                self.require_order(event.work_order_id)?;
                if self.events.iter().any(|other| other.id == event.id) {
                    return Err(PersistenceError::UniqueViolation {
                        constraint: "work_order_events_pkey",
                        value: event.id.to_string(),
                    });
                }
                self.events.push(event.clone());
            }
            Write::UpsertPhone { phone, .. } => {
                self.upsert_phone(phone)?;
            }
            Write::PutLink(link) => {
                if !self.phone_numbers.contains_key(&link.phone_number_id) {
                    return Err(PersistenceError::not_found(
                        "phone number",
                        link.phone_number_id,
                    ));
                }
                let clash = self.links.iter().any(|other| {
                    other.id != link.id
                        && other.owner == link.owner
                        && other.phone_number_id == link.phone_number_id
                });
                if clash {
                    return Err(PersistenceError::UniqueViolation {
                        constraint: "owner_phone_links_owner_phone",
                        value: format!("{}/{}", link.owner, link.phone_number_id),
                    });
                }
                match self.links.iter_mut().find(|other| other.id == link.id) {
                    Some(row) => *row = link.clone(),
                    None => self.links.push(link.clone()),
                }
            }
            Write::DeleteLink { id, owner } => {
                let before = self.links.len();
                self.links
                    .retain(|link| !(link.id == *id && link.owner == *owner));
                if self.links.len() == before {
                    return Err(PersistenceError::not_found("phone link", id));
                }
            }
        }
        Ok(())
    }

    /// Inserts a phone number or refreshes the raw form of the row that
    /// already holds its E.164. Returns the stored row.
    pub(crate) fn upsert_phone(&mut self, phone: &PhoneNumber) -> Result<PhoneNumber> {
        if let Some(existing) = self
            .e164_index
            .get(&phone.e164)
            .and_then(|id| self.phone_numbers.get_mut(id))
        {
            existing.raw_number = phone.raw_number.clone();
            return Ok(existing.clone());
        }
        if self.phone_numbers.contains_key(&phone.id) {
            return Err(PersistenceError::UniqueViolation {
                constraint: "phone_numbers_pkey",
                value: phone.id.to_string(),
            });
        }
        self.e164_index.insert(phone.e164.clone(), phone.id);
        self.phone_numbers.insert(phone.id, phone.clone());
        Ok(phone.clone())
    }

    fn require_order(&self, id: WorkOrderId) -> Result<()> {
        if self.work_orders.contains_key(&id) {
            Ok(())
        } else {
            Err(PersistenceError::not_found("work order", id))
        }
    }
}
