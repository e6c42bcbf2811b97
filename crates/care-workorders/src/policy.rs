//! Which status changes are allowed.
//!
//! Terminality and same-status moves are checked by the state machine
//! before a policy is consulted; a policy only decides between two distinct
//! statuses where the source is not terminal.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use care_models::WorkOrderStatus;

use crate::error::{Result, WorkOrderError};

/// Decides whether a work order may move between two statuses.
pub trait TransitionPolicy: Send + Sync {
    /// Returns `Err(reason)` when the move is not allowed.
    fn check(&self, from: WorkOrderStatus, to: WorkOrderStatus) -> std::result::Result<(), String>;
}

/// Allows every move.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveTransitions;

impl TransitionPolicy for PermissiveTransitions {
    fn check(&self, _from: WorkOrderStatus, _to: WorkOrderStatus) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Allows only the moves listed per source status.
///
/// The JSON form maps a status to the statuses it may move to:
///
/// ```json
/// { "draft": ["new", "canceled"], "new": ["scheduled", "canceled"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyTable {
    allowed: BTreeMap<WorkOrderStatus, BTreeSet<WorkOrderStatus>>,
}

impl AdjacencyTable {
    /// Creates a table that allows nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `from` to move to each of `targets`.
    pub fn allow(
        mut self,
        from: WorkOrderStatus,
        targets: impl IntoIterator<Item = WorkOrderStatus>,
    ) -> Self {
        self.allowed.entry(from).or_default().extend(targets);
        self
    }

    /// Parses the JSON form. Unknown status names are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| WorkOrderError::validation(format!("transition table: {}", e)))?;

        let mut table = AdjacencyTable::new();
        for (from, targets) in raw {
            let from = from.parse::<WorkOrderStatus>()?;
            let targets = targets
                .iter()
                .map(|t| t.parse::<WorkOrderStatus>())
                .collect::<std::result::Result<Vec<_>, _>>()?;
            table = table.allow(from, targets);
        }
        Ok(table)
    }

    /// Reads the JSON form from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| WorkOrderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Statuses reachable from `from` in one step.
    pub fn targets(&self, from: WorkOrderStatus) -> impl Iterator<Item = WorkOrderStatus> + '_ {
        self.allowed.get(&from).into_iter().flatten().copied()
    }
}

impl TransitionPolicy for AdjacencyTable {
    fn check(&self, from: WorkOrderStatus, to: WorkOrderStatus) -> std::result::Result<(), String> {
        let allowed = self
            .allowed
            .get(&from)
            .is_some_and(|targets| targets.contains(&to));
        if allowed {
            Ok(())
        } else {
            Err(format!("{} may not move to {}", from, to))
        }
    }
}
