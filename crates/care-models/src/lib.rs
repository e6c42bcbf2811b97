//! Core data models for Engine Care.
//!
//! This crate provides the domain values shared by every other crate in the
//! workspace: work orders, line items, audit events, phone numbers and the
//! links between owners and phone numbers. It holds no behavior beyond
//! small invariants that belong to the values themselves.

pub mod builders;
pub mod clock;
pub mod error;
pub mod event;
pub mod ids;
pub mod item;
pub mod phone;
pub mod work_order;

// Re-export main types
pub use builders::WorkOrderBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ErrorKind;
pub use event::{Event, EventType};
pub use ids::{
    CustomerId, EventId, ItemId, LinkId, OrganizationId, PhoneNumberId, ProjectId, UserId,
    VehicleId, WorkOrderId,
};
pub use item::{Item, ItemType};
pub use phone::{Owner, OwnerPhoneLink, PhoneNumber};
pub use work_order::{NewWorkOrder, ParseStatusError, Priority, WorkOrder, WorkOrderStatus};
