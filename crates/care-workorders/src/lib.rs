//! Work order engine for Engine Care.
//!
//! This crate provides:
//! - [`WorkOrderStateMachine`]: status transitions with lifecycle stamps,
//!   line item edits and total recomputation
//! - [`AuditTrail`]: the append-only event log of each order
//! - [`TransitionPolicy`]: which status moves are allowed, either anything
//!   ([`PermissiveTransitions`]) or a configured [`AdjacencyTable`]
//! - [`WorkOrderFilter`]: criteria for listing orders
//!
//! Each mutation runs as one store transaction, so a failure at any step
//! (including the audit append) leaves the order exactly as it was.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use care_models::{CustomerId, ItemType, NewWorkOrder, OrganizationId, SystemClock, UserId, VehicleId, WorkOrderStatus};
//! use care_persistence::{MemoryStore, Store};
//! use care_workorders::{AuditTrail, ItemEdit, NewItem, WorkOrderStateMachine};
//! use rust_decimal::Decimal;
//!
//! let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
//! let clock = Arc::new(SystemClock);
//! let machine = WorkOrderStateMachine::new(store.clone(), clock.clone());
//! let trail = AuditTrail::new(store, clock);
//! let actor = UserId::new();
//!
//! let request = NewWorkOrder::builder(OrganizationId::new(), CustomerId::new(), VehicleId::new(), "Brakes").build();
//! let order = machine.create(request, actor).unwrap();
//!
//! let pads = NewItem::new(ItemType::Part, "Pads", Decimal::ONE, 4500);
//! machine.mutate_items(order.id, &[ItemEdit::Add(pads)], actor).unwrap();
//! machine.transition(order.id, WorkOrderStatus::InProgress, actor, None).unwrap();
//!
//! for event in trail.list_by_order(order.id).unwrap() {
//!     println!("{:?} -> {:?}", event.from_status, event.to_status);
//! }
//! ```

pub mod audit;
pub mod edits;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod machine;
pub mod policy;

pub use audit::{AuditTrail, StatusChange};
pub use edits::{ItemEdit, ItemPatch, NewItem};
pub use error::{Result, WorkOrderError};
pub use filter::WorkOrderFilter;
pub use lifecycle::Stage;
pub use machine::{ItemMutation, WorkOrderStateMachine};
pub use policy::{AdjacencyTable, PermissiveTransitions, TransitionPolicy};
