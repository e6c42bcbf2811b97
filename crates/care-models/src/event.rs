//! Audit event types.
//!
//! Events are written once and never mutated. A transition event records
//! the status an order left and the status it entered; a manual note carries
//! only a message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, UserId, WorkOrderId};
use crate::work_order::WorkOrderStatus;

/// Kind of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Transition,
    ManualNote,
}

/// An entry in a work order's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub work_order_id: WorkOrderId,
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_status: Option<WorkOrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_status: Option<WorkOrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Creates a transition event.
    pub fn transition(
        work_order_id: WorkOrderId,
        from: WorkOrderStatus,
        to: WorkOrderStatus,
        message: Option<String>,
        created_by: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            work_order_id,
            event_type: EventType::Transition,
            from_status: Some(from),
            to_status: Some(to),
            message,
            created_by,
            created_at,
        }
    }

    /// Creates a free-text note.
    pub fn note(
        work_order_id: WorkOrderId,
        message: impl Into<String>,
        created_by: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            work_order_id,
            event_type: EventType::ManualNote,
            from_status: None,
            to_status: None,
            message: Some(message.into()),
            created_by,
            created_at,
        }
    }

    /// Returns true for status transition events.
    pub fn is_transition(&self) -> bool {
        self.event_type == EventType::Transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_event_carries_both_statuses() {
        let event = Event::transition(
            WorkOrderId::new(),
            WorkOrderStatus::Draft,
            WorkOrderStatus::New,
            None,
            Some(UserId::new()),
            Utc::now(),
        );

        assert!(event.is_transition());
        assert_eq!(event.from_status, Some(WorkOrderStatus::Draft));
        assert_eq!(event.to_status, Some(WorkOrderStatus::New));
    }

    #[test]
    fn test_note_event_has_no_statuses() {
        let event = Event::note(WorkOrderId::new(), "Customer called", None, Utc::now());

        assert_eq!(event.event_type, EventType::ManualNote);
        assert!(event.from_status.is_none());
        assert!(event.to_status.is_none());
        assert_eq!(event.message.as_deref(), Some("Customer called"));
    }

    #[test]
    fn test_event_type_serialization() {
        let json = serde_json::to_string(&EventType::ManualNote).unwrap();
        assert_eq!(json, "\"manual_note\"");
    }
}
