//! Lifecycle timestamps.
//!
//! A work order carries one timestamp per stage, and the stamps must read
//! in stage order: opened <= scheduled <= started <= completed <= closed.
//! Because any non-terminal status may move to any other under the
//! permissive policy, a stage can be reached after a later one. Such a
//! stamp is skipped rather than written out of order.

use chrono::{DateTime, Utc};

use care_models::{WorkOrder, WorkOrderStatus};

/// A stamped point in an order's life, in the order the stamps must read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Opened,
    Scheduled,
    Started,
    Completed,
    Closed,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Opened,
        Stage::Scheduled,
        Stage::Started,
        Stage::Completed,
        Stage::Closed,
    ];

    /// Stages an order reaches by entering `status`.
    pub fn entered_by(status: WorkOrderStatus) -> &'static [Stage] {
        match status {
            WorkOrderStatus::Scheduled => &[Stage::Scheduled],
            WorkOrderStatus::InProgress => &[Stage::Started],
            WorkOrderStatus::Completed => &[Stage::Completed, Stage::Closed],
            WorkOrderStatus::Canceled => &[Stage::Closed],
            _ => &[],
        }
    }

    pub fn get(self, order: &WorkOrder) -> Option<DateTime<Utc>> {
        match self {
            Stage::Opened => Some(order.opened_at),
            Stage::Scheduled => order.scheduled_at,
            Stage::Started => order.started_at,
            Stage::Completed => order.completed_at,
            Stage::Closed => order.closed_at,
        }
    }

    fn set(self, order: &mut WorkOrder, at: DateTime<Utc>) {
        match self {
            Stage::Opened => order.opened_at = at,
            Stage::Scheduled => order.scheduled_at = Some(at),
            Stage::Started => order.started_at = Some(at),
            Stage::Completed => order.completed_at = Some(at),
            Stage::Closed => order.closed_at = Some(at),
        }
    }
}

/// Stamps the stages `status` enters. Returns the stages actually written.
///
/// A stage is written only when it is unset and no later stage is set. The
/// written value is `now`, raised to the latest earlier stamp if the clock
/// reads earlier than that.
pub fn stamp_lifecycle(
    order: &mut WorkOrder,
    status: WorkOrderStatus,
    now: DateTime<Utc>,
) -> Vec<Stage> {
    let mut stamped = Vec::new();

    for &stage in Stage::entered_by(status) {
        if stage.get(order).is_some() {
            continue;
        }
        let later_set = Stage::ALL
            .iter()
            .filter(|other| **other > stage)
            .any(|other| other.get(order).is_some());
        if later_set {
            continue;
        }

        let floor = Stage::ALL
            .iter()
            .filter(|other| **other < stage)
            .filter_map(|other| other.get(order))
            .max();
        let at = match floor {
            Some(floor) if floor > now => floor,
            _ => now,
        };

        stage.set(order, at);
        stamped.push(stage);
    }

    stamped
}

/// Returns true when the set stamps read in stage order.
pub fn is_monotonic(order: &WorkOrder) -> bool {
    let stamps: Vec<DateTime<Utc>> = Stage::ALL.iter().filter_map(|s| s.get(order)).collect();
    stamps.windows(2).all(|pair| pair[0] <= pair[1])
}
