//! Work order types.
//!
//! A work order is a trackable repair or service job against one vehicle
//! for one customer. Its status only changes through the state machine in
//! `care-workorders`; the monetary fields are derived from its line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{CustomerId, OrganizationId, ProjectId, UserId, VehicleId, WorkOrderId};

/// Lifecycle status of a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    /// Being written up, not yet accepted by the shop.
    #[default]
    Draft,
    New,
    Scheduled,
    AwaitingCustomer,
    InProgress,
    WaitingParts,
    AwaitingApproval,
    ReadyForPickup,
    ReadyForDeliver,
    EnRoute,
    /// Terminal: the job is done.
    Completed,
    /// Terminal: the job was abandoned.
    Canceled,
}

impl WorkOrderStatus {
    /// Every status, in declaration order.
    pub const ALL: [WorkOrderStatus; 12] = [
        WorkOrderStatus::Draft,
        WorkOrderStatus::New,
        WorkOrderStatus::Scheduled,
        WorkOrderStatus::AwaitingCustomer,
        WorkOrderStatus::InProgress,
        WorkOrderStatus::WaitingParts,
        WorkOrderStatus::AwaitingApproval,
        WorkOrderStatus::ReadyForPickup,
        WorkOrderStatus::ReadyForDeliver,
        WorkOrderStatus::EnRoute,
        WorkOrderStatus::Completed,
        WorkOrderStatus::Canceled,
    ];

    /// Returns true when no transition may leave this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Canceled)
    }

    /// Returns the wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Draft => "draft",
            WorkOrderStatus::New => "new",
            WorkOrderStatus::Scheduled => "scheduled",
            WorkOrderStatus::AwaitingCustomer => "awaiting_customer",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::WaitingParts => "waiting_parts",
            WorkOrderStatus::AwaitingApproval => "awaiting_approval",
            WorkOrderStatus::ReadyForPickup => "ready_for_pickup",
            WorkOrderStatus::ReadyForDeliver => "ready_for_deliver",
            WorkOrderStatus::EnRoute => "en_route",
            WorkOrderStatus::Completed => "completed",
            WorkOrderStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known work order status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown work order status: {}", self.0)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for WorkOrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        WorkOrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ParseStatusError(wanted.to_string()))
    }
}

/// Priority levels for work orders.
///
/// Higher numeric value = higher priority.
/// Urgent (4) > High (3) > Normal (2) > Low (1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Returns the numeric value of this priority.
    pub fn as_value(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Normal => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    /// Returns the wire name of this priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_value().cmp(&other.as_value())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// A repair or service job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub organization_id: OrganizationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    pub customer_id: CustomerId,
    pub vehicle_id: VehicleId,

    pub status: WorkOrderStatus,
    pub priority: Priority,

    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Set once, when the order is created.
    pub opened_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,

    pub created_by: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl WorkOrder {
    /// Opens a new draft work order from a creation request.
    pub fn open(request: NewWorkOrder, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: WorkOrderId::new(),
            organization_id: request.organization_id,
            project_id: request.project_id,
            customer_id: request.customer_id,
            vehicle_id: request.vehicle_id,
            status: WorkOrderStatus::Draft,
            priority: request.priority,
            title: request.title,
            description: request.description,
            opened_at: now,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            closed_at: None,
            created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
        }
    }

    /// Returns true when the order is completed or canceled.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Records who touched the order and when.
    pub fn touch(&mut self, actor: UserId, now: DateTime<Utc>) {
        self.updated_by = Some(actor);
        self.updated_at = now;
    }
}

/// Payload for creating a work order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkOrder {
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    pub customer_id: CustomerId,
    pub vehicle_id: VehicleId,
    #[serde(default)]
    pub priority: Priority,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}
