//! The store boundary consumed by the domain services.

use care_models::{
    Event, Item, ItemId, LinkId, Owner, OwnerPhoneLink, PhoneNumber, PhoneNumberId, WorkOrder,
    WorkOrderId,
};

use crate::error::{PersistenceError, Result};

/// A transactional store.
///
/// Implementations must give each transaction a consistent view of the
/// committed data and must refuse to commit a transaction whose reads were
/// invalidated by a concurrent commit.
pub trait Store: Send + Sync {
    /// Opens a transaction.
    fn begin(&self) -> Result<Box<dyn Transaction + '_>>;
}

/// One atomic unit of reads and writes.
///
/// Reads see the snapshot the transaction started from plus its own writes.
/// Dropping a transaction without calling [`Transaction::commit`] discards
/// every staged write.
pub trait Transaction {
    // Work orders

    fn work_order(&mut self, id: WorkOrderId) -> Result<Option<WorkOrder>>;

    /// All work orders, in no particular order.
    fn work_orders(&mut self) -> Result<Vec<WorkOrder>>;

    /// Fails with `UniqueViolation` if the id is taken.
    fn insert_work_order(&mut self, order: &WorkOrder) -> Result<()>;

    /// Fails with `NotFound` if the order does not exist.
    fn update_work_order(&mut self, order: &WorkOrder) -> Result<()>;

    // Line items

    /// Items of one order sorted by position.
    fn items(&mut self, work_order_id: WorkOrderId) -> Result<Vec<Item>>;

    /// Inserts or replaces an item. Positions are unique per order.
    fn put_item(&mut self, item: &Item) -> Result<()>;

    fn delete_item(&mut self, work_order_id: WorkOrderId, id: ItemId) -> Result<()>;

    // Audit events

    /// Appends an event. Events are never replaced.
    fn append_event(&mut self, event: &Event) -> Result<()>;

    /// Events of one order in insertion order.
    fn events(&mut self, work_order_id: WorkOrderId) -> Result<Vec<Event>>;

    // Phone numbers

    fn phone_number(&mut self, id: PhoneNumberId) -> Result<Option<PhoneNumber>>;

    fn phone_by_e164(&mut self, e164: &str) -> Result<Option<PhoneNumber>>;

    /// Inserts `phone`, or, when a row with the same E.164 exists, replaces
    /// that row's raw number and returns it.
    ///
    /// The upsert is resolved again by E.164 at commit, so two transactions
    /// registering the same number never conflict over it. If another
    /// transaction committed the number first, links staged here to the
    /// returned id are stored against that committed row instead.
    fn upsert_phone_number(&mut self, phone: &PhoneNumber) -> Result<PhoneNumber>;

    // Owner links

    /// Links of one owner in insertion order.
    fn links(&mut self, owner: Owner) -> Result<Vec<OwnerPhoneLink>>;

    /// Inserts or replaces a link. (owner, phone number) pairs are unique.
    fn put_link(&mut self, link: &OwnerPhoneLink) -> Result<()>;

    fn delete_link(&mut self, owner: Owner, id: LinkId) -> Result<()>;

    /// Makes every staged write visible, or none of them.
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Runs `f` inside a transaction, committing on `Ok` and rolling back on
/// `Err`.
///
/// Any error type that can absorb a [`PersistenceError`] works, so services
/// can use their own error enums inside the closure.
pub fn run_in_tx<T, E, F>(store: &dyn Store, f: F) -> std::result::Result<T, E>
where
    E: From<PersistenceError>,
    F: FnOnce(&mut dyn Transaction) -> std::result::Result<T, E>,
{
    let mut tx = store.begin()?;
    let value = f(&mut *tx)?;
    tx.commit()?;
    Ok(value)
}
