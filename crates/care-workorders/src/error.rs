//! Error types for work order operations.

use std::path::PathBuf;

use care_billing::BillingError;
use care_models::{ErrorKind, ItemId, ParseStatusError, WorkOrderId, WorkOrderStatus};
use care_persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur during work order operations.
#[derive(Error, Debug)]
pub enum WorkOrderError {
    /// Work order not found.
    #[error("work order not found: {0}")]
    NotFound(WorkOrderId),

    /// Line item not found on the work order.
    #[error("item {item} not found on work order {work_order}")]
    ItemNotFound {
        work_order: WorkOrderId,
        item: ItemId,
    },

    /// Status change refused.
    #[error("cannot move work order from {from} to {to}: {reason}")]
    InvalidTransition {
        from: WorkOrderStatus,
        to: WorkOrderStatus,
        reason: String,
    },

    /// Requested status is not a known status.
    #[error(transparent)]
    UnknownStatus(#[from] ParseStatusError),

    /// Items cannot change once the order is completed or canceled.
    #[error("work order {id} is {status}; its items can no longer change")]
    OrderClosed {
        id: WorkOrderId,
        status: WorkOrderStatus,
    },

    /// Malformed input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Totals could not be computed from the items.
    #[error("billing error: {0}")]
    Billing(#[from] BillingError),

    /// The audit trail contradicts itself.
    #[error("audit trail of work order {id} is inconsistent: {detail}")]
    CorruptTrail { id: WorkOrderId, detail: String },

    /// A file the engine depends on could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persistence error.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl WorkOrderError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        WorkOrderError::Validation(message.into())
    }

    /// Classifies this failure for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkOrderError::NotFound(_) | WorkOrderError::ItemNotFound { .. } => {
                ErrorKind::NotFound
            }
            WorkOrderError::InvalidTransition { .. } | WorkOrderError::UnknownStatus(_) => {
                ErrorKind::InvalidTransition
            }
            WorkOrderError::OrderClosed { .. } => ErrorKind::OrderClosed,
            WorkOrderError::Validation(_) | WorkOrderError::Billing(_) => {
                ErrorKind::ValidationError
            }
            WorkOrderError::CorruptTrail { .. } | WorkOrderError::Io { .. } => ErrorKind::Internal,
            WorkOrderError::Persistence(e) => e.kind(),
        }
    }
}

/// Result type alias for work order operations.
pub type Result<T> = std::result::Result<T, WorkOrderError>;
