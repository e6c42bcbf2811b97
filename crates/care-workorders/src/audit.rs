//! Append-only audit trail of work order events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use care_models::{Clock, Event, UserId, WorkOrder, WorkOrderId, WorkOrderStatus};
use care_persistence::{run_in_tx, PersistenceError, Store, Transaction};

use crate::error::{Result, WorkOrderError};

/// One entry of a reconstructed status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: WorkOrderStatus,
    pub entered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by: Option<UserId>,
}

/// Records and reads work order events.
///
/// Events are never updated or deleted. Transition events are written by
/// the state machine through [`AuditTrail::append`] inside its own
/// transaction; notes get a transaction of their own.
pub struct AuditTrail {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Appends `event` within the caller's transaction.
    ///
    /// Fails only when the event's work order does not exist.
    pub fn append(tx: &mut dyn Transaction, event: &Event) -> Result<()> {
        tx.append_event(event).map_err(|e| match e {
            PersistenceError::NotFound { .. } => WorkOrderError::NotFound(event.work_order_id),
            other => other.into(),
        })
    }

    /// Records a free-text note. Notes are allowed on closed orders.
    pub fn append_note(
        &self,
        work_order_id: WorkOrderId,
        message: &str,
        actor: Option<UserId>,
    ) -> Result<Event> {
        let message = message.trim();
        if message.is_empty() {
            return Err(WorkOrderError::validation("note must not be empty"));
        }

        let event = Event::note(work_order_id, message, actor, self.clock.now());
        run_in_tx(self.store.as_ref(), |tx| Self::append(tx, &event))?;

        info!(order_id = %work_order_id, event_id = %event.id, "Added note");
        Ok(event)
    }

    /// Events of an order, oldest first. Events with equal timestamps keep
    /// the order they were written in.
    pub fn list_by_order(&self, work_order_id: WorkOrderId) -> Result<Vec<Event>> {
        let (_, events) = run_in_tx(self.store.as_ref(), |tx| Self::read_trail(tx, work_order_id))?;
        debug!(order_id = %work_order_id, count = events.len(), "Listed events");
        Ok(events)
    }

    /// Reads an order and its sorted events from one snapshot.
    fn read_trail(
        tx: &mut dyn Transaction,
        work_order_id: WorkOrderId,
    ) -> Result<(WorkOrder, Vec<Event>)> {
        let order = tx
            .work_order(work_order_id)?
            .ok_or(WorkOrderError::NotFound(work_order_id))?;
        let mut events = tx.events(work_order_id)?;
        events.sort_by_key(|event| event.created_at);
        Ok((order, events))
    }

    /// Rebuilds the sequence of statuses the order went through.
    ///
    /// The first entry is the draft status the order was opened in. Each
    /// transition must leave the status the previous one entered.
    pub fn replay(&self, work_order_id: WorkOrderId) -> Result<Vec<StatusChange>> {
        let (order, events) =
            run_in_tx(self.store.as_ref(), |tx| Self::read_trail(tx, work_order_id))?;

        let mut history = vec![StatusChange {
            status: WorkOrderStatus::Draft,
            entered_at: order.opened_at,
            by: Some(order.created_by),
        }];

        for event in events.iter().filter(|e| e.is_transition()) {
            let (Some(from), Some(to)) = (event.from_status, event.to_status) else {
                return Err(WorkOrderError::CorruptTrail {
                    id: work_order_id,
                    detail: format!("transition event {} lacks a status", event.id),
                });
            };
            let current = history
                .last()
                .map(|change| change.status)
                .unwrap_or_default();
            if from != current {
                return Err(WorkOrderError::CorruptTrail {
                    id: work_order_id,
                    detail: format!(
                        "event {} leaves {} but the order was {}",
                        event.id, from, current
                    ),
                });
            }
            history.push(StatusChange {
                status: to,
                entered_at: event.created_at,
                by: event.created_by,
            });
        }

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use care_models::{CustomerId, ManualClock, NewWorkOrder, OrganizationId, VehicleId};
    use care_persistence::MemoryStore;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts the transactions opened against the wrapped store.
    struct CountingStore {
        inner: Arc<MemoryStore>,
        begun: AtomicUsize,
    }

    impl Store for CountingStore {
        fn begin(&self) -> care_persistence::Result<Box<dyn Transaction + '_>> {
            self.begun.fetch_add(1, Ordering::SeqCst);
            self.inner.begin()
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        trail: AuditTrail,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let trail = AuditTrail::new(store.clone(), clock.clone());
        Fixture { store, clock, trail }
    }

    fn seed_order(f: &Fixture) -> WorkOrder {
        let request = NewWorkOrder::builder(
            OrganizationId::new(),
            CustomerId::new(),
            VehicleId::new(),
            "Inspection",
        )
        .build();
        let order = WorkOrder::open(request, UserId::new(), f.clock.now());
        run_in_tx(f.store.as_ref(), |tx| tx.insert_work_order(&order)).unwrap();
        order
    }

    fn append_transition(f: &Fixture, order: WorkOrderId, from: WorkOrderStatus, to: WorkOrderStatus) {
        let event = Event::transition(order, from, to, None, Some(UserId::new()), f.clock.now());
        run_in_tx(f.store.as_ref(), |tx| AuditTrail::append(tx, &event)).unwrap();
    }

    #[test]
    fn test_append_to_missing_order_is_not_found() {
        let f = fixture();
        let missing = WorkOrderId::new();
        let event = Event::note(missing, "hello", None, Utc::now());

        let err = run_in_tx(f.store.as_ref(), |tx| AuditTrail::append(tx, &event)).unwrap_err();
        assert!(matches!(err, WorkOrderError::NotFound(id) if id == missing));
    }

    #[test]
    fn test_note_round_trip() {
        let f = fixture();
        let order = seed_order(&f);
        let actor = UserId::new();

        let note = f.trail.append_note(order.id, "  Customer approved estimate ", Some(actor)).unwrap();

        let events = f.trail.list_by_order(order.id).unwrap();
        assert_eq!(events, vec![note]);
        assert_eq!(events[0].message.as_deref(), Some("Customer approved estimate"));
        assert_eq!(events[0].created_by, Some(actor));
    }

    #[test]
    fn test_empty_note_rejected() {
        let f = fixture();
        let order = seed_order(&f);
        let err = f.trail.append_note(order.id, "   ", None).unwrap_err();
        assert!(matches!(err, WorkOrderError::Validation(_)));
    }

    #[test]
    fn test_list_sorted_by_time_then_insertion() {
        let f = fixture();
        let order = seed_order(&f);

        f.clock.advance(Duration::minutes(10));
        f.trail.append_note(order.id, "later", None).unwrap();

        // Written second but stamped earlier.
        f.clock.advance(Duration::minutes(-5));
        f.trail.append_note(order.id, "earlier-a", None).unwrap();
        f.trail.append_note(order.id, "earlier-b", None).unwrap();

        let messages: Vec<String> = f
            .trail
            .list_by_order(order.id)
            .unwrap()
            .into_iter()
            .filter_map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["earlier-a", "earlier-b", "later"]);
    }

    #[test]
    fn test_list_for_missing_order() {
        let f = fixture();
        let err = f.trail.list_by_order(WorkOrderId::new()).unwrap_err();
        assert!(matches!(err, WorkOrderError::NotFound(_)));
    }

    #[test]
    fn test_replay_rebuilds_history() {
        let f = fixture();
        let order = seed_order(&f);

        f.clock.advance(Duration::minutes(1));
        append_transition(&f, order.id, WorkOrderStatus::Draft, WorkOrderStatus::New);
        f.trail.append_note(order.id, "waiting on the customer", None).unwrap();
        f.clock.advance(Duration::minutes(1));
        append_transition(&f, order.id, WorkOrderStatus::New, WorkOrderStatus::InProgress);

        let statuses: Vec<WorkOrderStatus> = f
            .trail
            .replay(order.id)
            .unwrap()
            .into_iter()
            .map(|change| change.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                WorkOrderStatus::Draft,
                WorkOrderStatus::New,
                WorkOrderStatus::InProgress
            ]
        );
    }

    #[test]
    fn test_replay_reads_one_snapshot() {
        let f = fixture();
        let order = seed_order(&f);
        append_transition(&f, order.id, WorkOrderStatus::Draft, WorkOrderStatus::New);

        let counting = Arc::new(CountingStore {
            inner: f.store.clone(),
            begun: AtomicUsize::new(0),
        });
        let trail = AuditTrail::new(counting.clone(), f.clock.clone());

        let history = trail.replay(order.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].entered_at, order.opened_at);
        assert_eq!(counting.begun.load(Ordering::SeqCst), 1);

        let err = trail.replay(WorkOrderId::new()).unwrap_err();
        assert!(matches!(err, WorkOrderError::NotFound(_)));
        assert_eq!(counting.begun.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_replay_detects_broken_chain() {
        let f = fixture();
        let order = seed_order(&f);

        append_transition(&f, order.id, WorkOrderStatus::Draft, WorkOrderStatus::New);
        append_transition(&f, order.id, WorkOrderStatus::Scheduled, WorkOrderStatus::InProgress);

        let err = f.trail.replay(order.id).unwrap_err();
        assert!(matches!(err, WorkOrderError::CorruptTrail { .. }));
    }
}
