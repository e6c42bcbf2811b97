//! Optimistic in-memory store with optional JSON snapshots.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use care_models::{
    Event, Item, ItemId, LinkId, Owner, OwnerPhoneLink, PhoneNumber, PhoneNumberId, WorkOrder,
    WorkOrderId,
};
use tracing::{debug, info, warn};

use crate::atomic::{read_snapshot, write_snapshot};
use crate::error::{PersistenceError, Result};
use crate::store::{Store, Transaction};
use crate::tables::{RowKey, Snapshot, Tables, Write};

/// A [`Store`] that keeps every table in memory.
///
/// Each transaction works on a copy-on-write clone of the committed tables
/// and remembers the version of every row or row set it read. Commit
/// re-checks those versions under the store lock and fails with
/// [`PersistenceError::Conflict`] if any of them moved, which makes
/// committed transactions serializable.
///
/// A store created with [`MemoryStore::open`] also writes a snapshot of the
/// tables to disk on every commit that changed something.
#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: Mutex<Arc<Tables>>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// Creates an empty, purely in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a file-backed store, loading the snapshot at `path` if one
    /// exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tables = match read_snapshot::<Snapshot>(&path)? {
            Some(snapshot) => Tables::from_snapshot(snapshot),
            None => Tables::default(),
        };
        info!(path = %path.display(), "Opened store");
        Ok(Self {
            committed: Mutex::new(Arc::new(tables)),
            path: Some(path),
        })
    }

    /// Snapshot file, if the store is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn current(&self) -> Result<Arc<Tables>> {
        let committed = self
            .committed
            .lock()
            .map_err(|e| PersistenceError::LockPoisoned(e.to_string()))?;
        Ok(Arc::clone(&committed))
    }
}

impl Store for MemoryStore {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>> {
        Ok(Box::new(MemoryTransaction {
            store: self,
            tables: self.current()?,
            reads: HashMap::new(),
            writes: Vec::new(),
        }))
    }
}

struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    tables: Arc<Tables>,
    reads: HashMap<RowKey, u64>,
    writes: Vec<Write>,
}

impl MemoryTransaction<'_> {
    /// Remembers the version of `key` as first seen by this transaction.
    fn track(&mut self, key: RowKey) {
        let version = self.tables.version(&key);
        self.reads.entry(key).or_insert(version);
    }

    fn stage(&mut self, write: Write) -> Result<()> {
        Arc::make_mut(&mut self.tables).apply(&write)?;
        self.writes.push(write);
        Ok(())
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn work_order(&mut self, id: WorkOrderId) -> Result<Option<WorkOrder>> {
        self.track(RowKey::WorkOrder(id));
        Ok(self.tables.work_order(id).cloned())
    }

    fn work_orders(&mut self) -> Result<Vec<WorkOrder>> {
        self.track(RowKey::OrderIndex);
        Ok(self.tables.work_orders().cloned().collect())
    }

    fn insert_work_order(&mut self, order: &WorkOrder) -> Result<()> {
        self.stage(Write::InsertWorkOrder(order.clone()))
    }

    fn update_work_order(&mut self, order: &WorkOrder) -> Result<()> {
        self.stage(Write::UpdateWorkOrder(order.clone()))
    }

    fn items(&mut self, work_order_id: WorkOrderId) -> Result<Vec<Item>> {
        self.track(RowKey::OrderItems(work_order_id));
        Ok(self.tables.items_of(work_order_id))
    }

    fn put_item(&mut self, item: &Item) -> Result<()> {
        // The position check reads the order's item set.
        self.track(RowKey::OrderItems(item.work_order_id));
        self.stage(Write::PutItem(item.clone()))
    }

    fn delete_item(&mut self, work_order_id: WorkOrderId, id: ItemId) -> Result<()> {
        self.track(RowKey::OrderItems(work_order_id));
        self.stage(Write::DeleteItem { id, work_order_id })
    }

    fn append_event(&mut self, event: &Event) -> Result<()> {
        self.stage(Write::AppendEvent(event.clone()))
    }

    fn events(&mut self, work_order_id: WorkOrderId) -> Result<Vec<Event>> {
        self.track(RowKey::OrderEvents(work_order_id));
        Ok(self.tables.events_of(work_order_id))
    }

    fn phone_number(&mut self, id: PhoneNumberId) -> Result<Option<PhoneNumber>> {
        let phone = self.tables.phone_number(id).cloned();
        if let Some(phone) = &phone {
            self.track(RowKey::Phone(phone.e164.clone()));
        }
        Ok(phone)
    }

    fn phone_by_e164(&mut self, e164: &str) -> Result<Option<PhoneNumber>> {
        self.track(RowKey::Phone(e164.to_string()));
        Ok(self.tables.phone_by_e164(e164).cloned())
    }

    fn upsert_phone_number(&mut self, phone: &PhoneNumber) -> Result<PhoneNumber> {
        // Not tracked: commit resolves the E.164 again against committed rows.
        let stored = Arc::make_mut(&mut self.tables).upsert_phone(phone)?;
        self.writes.push(Write::UpsertPhone {
            phone: phone.clone(),
            resolved: stored.id,
        });
        Ok(stored)
    }

    fn links(&mut self, owner: Owner) -> Result<Vec<OwnerPhoneLink>> {
        self.track(RowKey::OwnerLinks(owner));
        Ok(self.tables.links_of(owner))
    }

    fn put_link(&mut self, link: &OwnerPhoneLink) -> Result<()> {
        self.track(RowKey::OwnerLinks(link.owner));
        self.stage(Write::PutLink(link.clone()))
    }

    fn delete_link(&mut self, owner: Owner, id: LinkId) -> Result<()> {
        self.track(RowKey::OwnerLinks(owner));
        self.stage(Write::DeleteLink { id, owner })
    }

    fn commit(self: Box<Self>) -> Result<()> {
        if self.writes.is_empty() {
            debug!(reads = self.reads.len(), "Committed read-only transaction");
            return Ok(());
        }

        let mut committed = self
            .store
            .committed
            .lock()
            .map_err(|e| PersistenceError::LockPoisoned(e.to_string()))?;

        for (key, seen) in &self.reads {
            let current = committed.version(key);
            if current != *seen {
                warn!(?key, seen, current, "Transaction conflict");
                return Err(PersistenceError::Conflict(format!(
                    "{:?} changed since it was read",
                    key
                )));
            }
        }

        let mut next = Tables::clone(&committed);
        // Working-copy phone ids that resolve to a row committed meanwhile.
        let mut moved: HashMap<PhoneNumberId, PhoneNumberId> = HashMap::new();
        for write in &self.writes {
            match write {
                Write::UpsertPhone { phone, resolved } => {
                    let stored = next.upsert_phone(phone)?;
                    if stored.id != *resolved {
                        debug!(
                            e164 = %phone.e164,
                            phone_number_id = %stored.id,
                            "Upsert resolved to committed row"
                        );
                        moved.insert(*resolved, stored.id);
                    }
                }
                Write::PutLink(link) if moved.contains_key(&link.phone_number_id) => {
                    let mut link = link.clone();
                    if let Some(id) = moved.get(&link.phone_number_id) {
                        link.phone_number_id = *id;
                    }
                    next.apply(&Write::PutLink(link))?;
                }
                other => next.apply(other)?,
            }
        }
        let seq = next.stamp(&self.writes);

        if let Some(path) = &self.store.path {
            write_snapshot(path, &next.to_snapshot())?;
        }
        *committed = Arc::new(next);

        debug!(seq, writes = self.writes.len(), "Committed transaction");
        Ok(())
    }
}
