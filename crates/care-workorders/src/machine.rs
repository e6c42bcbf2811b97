//! WorkOrderStateMachine - status transitions and item edits.
//!
//! Every mutation is one store transaction: the order row, its items, the
//! recomputed totals and the audit event commit together or not at all.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use care_billing::BillingAggregator;
use care_models::{
    Clock, Event, Item, NewWorkOrder, UserId, WorkOrder, WorkOrderId, WorkOrderStatus,
};
use care_persistence::{run_in_tx, Store, Transaction};

use crate::audit::AuditTrail;
use crate::edits::{apply_edits, ItemEdit};
use crate::error::{Result, WorkOrderError};
use crate::filter::WorkOrderFilter;
use crate::lifecycle::stamp_lifecycle;
use crate::policy::{PermissiveTransitions, TransitionPolicy};

/// An order and its items after a successful item mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMutation {
    pub order: WorkOrder,
    pub items: Vec<Item>,
}

/// Validates and applies work order status changes and item edits.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use care_models::{CustomerId, NewWorkOrder, OrganizationId, SystemClock, UserId, VehicleId, WorkOrderStatus};
/// use care_persistence::MemoryStore;
/// use care_workorders::WorkOrderStateMachine;
///
/// let machine = WorkOrderStateMachine::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
/// let actor = UserId::new();
/// let request = NewWorkOrder::builder(OrganizationId::new(), CustomerId::new(), VehicleId::new(), "Oil change").build();
///
/// let order = machine.create(request, actor).unwrap();
/// machine.transition(order.id, WorkOrderStatus::New, actor, None).unwrap();
/// ```
pub struct WorkOrderStateMachine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    policy: Arc<dyn TransitionPolicy>,
}

impl WorkOrderStateMachine {
    /// Creates a state machine that allows any move between non-terminal
    /// statuses.
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policy: Arc::new(PermissiveTransitions),
        }
    }

    /// Replaces the transition policy.
    pub fn with_policy(mut self, policy: Arc<dyn TransitionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Opens a draft work order with zero totals.
    pub fn create(&self, request: NewWorkOrder, actor: UserId) -> Result<WorkOrder> {
        let mut request = request;
        request.title = request.title.trim().to_string();
        if request.title.is_empty() {
            return Err(WorkOrderError::validation("title must not be empty"));
        }

        let order = WorkOrder::open(request, actor, self.clock.now());
        run_in_tx(self.store.as_ref(), |tx| tx.insert_work_order(&order))?;

        info!(order_id = %order.id, priority = %order.priority, "Created work order");
        Ok(order)
    }

    /// Loads one work order.
    pub fn get(&self, id: WorkOrderId) -> Result<WorkOrder> {
        run_in_tx(self.store.as_ref(), |tx| load_order(tx, id))
    }

    /// Items of an order by position.
    pub fn items(&self, id: WorkOrderId) -> Result<Vec<Item>> {
        run_in_tx(self.store.as_ref(), |tx| {
            load_order(tx, id)?;
            tx.items(id).map_err(WorkOrderError::from)
        })
    }

    /// Orders matching `filter`, highest priority first, then oldest first.
    pub fn list(&self, filter: &WorkOrderFilter) -> Result<Vec<WorkOrder>> {
        let mut orders: Vec<WorkOrder> = run_in_tx(self.store.as_ref(), |tx| tx.work_orders())?
            .into_iter()
            .filter(|order| filter.matches(order))
            .collect();

        orders.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.opened_at.cmp(&b.opened_at))
        });

        debug!(count = orders.len(), "Listed work orders");
        Ok(orders)
    }

    /// Moves an order to `to`.
    ///
    /// On success the new status, any lifecycle stamp the status implies,
    /// recomputed totals, the editor stamp and one transition event commit
    /// together. A rejected transition changes nothing.
    pub fn transition(
        &self,
        id: WorkOrderId,
        to: WorkOrderStatus,
        actor: UserId,
        message: Option<String>,
    ) -> Result<WorkOrder> {
        let now = self.clock.now();

        let result: Result<(WorkOrder, WorkOrderStatus)> = run_in_tx(self.store.as_ref(), |tx| {
            let mut order = load_order(tx, id)?;
            let from = order.status;

            self.check_transition(from, to)?;

            // Every earlier transition stamped updated_at, so this keeps the
            // trail in causal order when the clock steps back.
            let at = now.max(order.updated_at);

            order.status = to;
            let stamped = stamp_lifecycle(&mut order, to, at);

            let items = tx.items(id)?;
            BillingAggregator::compute(&items)?.apply_to(&mut order);
            order.touch(actor, at);
            tx.update_work_order(&order)?;

            let event = Event::transition(id, from, to, message, Some(actor), at);
            AuditTrail::append(tx, &event)?;

            debug!(order_id = %id, stamped = ?stamped, "Stamped lifecycle");
            Ok((order, from))
        });

        match result {
            Ok((order, from)) => {
                info!(order_id = %id, from = %from, to = %to, "Transitioned work order");
                Ok(order)
            }
            Err(e) => {
                warn!(order_id = %id, to = %to, error = %e, "Transition rejected");
                Err(e)
            }
        }
    }

    /// Like [`transition`](Self::transition), with the target status given
    /// by name. An unknown name is an invalid transition.
    pub fn transition_named(
        &self,
        id: WorkOrderId,
        to: &str,
        actor: UserId,
        message: Option<String>,
    ) -> Result<WorkOrder> {
        let to = to.parse::<WorkOrderStatus>().inspect_err(|e| {
            warn!(order_id = %id, error = %e, "Transition rejected");
        })?;
        self.transition(id, to, actor, message)
    }

    /// Applies item edits and recomputes the order's totals.
    ///
    /// Fails with `OrderClosed` on a completed or canceled order. The edits
    /// apply in order and are validated as a whole, so a batch may swap two
    /// positions.
    pub fn mutate_items(
        &self,
        id: WorkOrderId,
        edits: &[ItemEdit],
        actor: UserId,
    ) -> Result<ItemMutation> {
        let now = self.clock.now();

        let result: Result<ItemMutation> = run_in_tx(self.store.as_ref(), |tx| {
            let mut order = load_order(tx, id)?;
            if order.is_terminal() {
                return Err(WorkOrderError::OrderClosed {
                    id,
                    status: order.status,
                });
            }

            let current = tx.items(id)?;
            let mut items = current.clone();
            apply_edits(&mut items, id, edits, now)?;

            let totals = BillingAggregator::compute(&items)?;
            persist_items(tx, id, &current, &items)?;

            totals.apply_to(&mut order);
            let at = now.max(order.updated_at);
            order.touch(actor, at);
            tx.update_work_order(&order)?;

            Ok(ItemMutation { order, items })
        });

        match result {
            Ok(mutation) => {
                info!(
                    order_id = %id,
                    edits = edits.len(),
                    total_cents = mutation.order.total_cents,
                    "Updated work order items"
                );
                Ok(mutation)
            }
            Err(e) => {
                warn!(order_id = %id, error = %e, "Item edit rejected");
                Err(e)
            }
        }
    }

    fn check_transition(&self, from: WorkOrderStatus, to: WorkOrderStatus) -> Result<()> {
        let rejected = |reason: String| WorkOrderError::InvalidTransition { from, to, reason };

        if from.is_terminal() {
            return Err(rejected(format!("{} is a terminal status", from)));
        }
        if from == to {
            return Err(rejected("order is already in that status".to_string()));
        }
        self.policy.check(from, to).map_err(rejected)
    }
}

fn load_order(tx: &mut dyn Transaction, id: WorkOrderId) -> Result<WorkOrder> {
    tx.work_order(id)?.ok_or(WorkOrderError::NotFound(id))
}

/// Writes the difference between two versions of an order's items.
///
/// Removed items and items whose position moved are deleted first, so that
/// re-inserting them cannot collide with a position another item is
/// leaving.
fn persist_items(
    tx: &mut dyn Transaction,
    id: WorkOrderId,
    before: &[Item],
    after: &[Item],
) -> Result<()> {
    let after_by_id: HashMap<_, _> = after.iter().map(|item| (item.id, item)).collect();
    let before_by_id: HashMap<_, _> = before.iter().map(|item| (item.id, item)).collect();

    for old in before {
        match after_by_id.get(&old.id) {
            Some(new) if new.position == old.position => {}
            _ => tx.delete_item(id, old.id)?,
        }
    }

    for item in after {
        let unchanged = before_by_id
            .get(&item.id)
            .is_some_and(|old| *old == item);
        if !unchanged {
            tx.put_item(item)?;
        }
    }

    Ok(())
}
