//! Where the CLI keeps its data.
//!
//! Everything lives under one state directory:
//!
//! ```text
//! ~/.engine-care/
//! ├── store.json        # Committed store snapshot
//! └── transitions.json  # Optional allowed-transition table
//! ```
//!
//! The directory comes from `--state-dir`, then `CARE_STATE_DIR` (both
//! handled by clap), then `~/.engine-care`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use care_models::{Clock, SystemClock};
use care_persistence::{MemoryStore, PersistenceError, Store};
use care_phones::PhoneDirectory;
use care_workorders::{AdjacencyTable, AuditTrail, TransitionPolicy, WorkOrderError, WorkOrderStateMachine};

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".engine-care";

const STORE_FILE: &str = "store.json";
const TRANSITIONS_FILE: &str = "transitions.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open store: {0}")]
    Store(#[from] PersistenceError),

    #[error("invalid transition table: {0}")]
    Transitions(#[from] WorkOrderError),
}

/// Resolved CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub state_dir: PathBuf,
}

impl Config {
    /// Uses `state_dir` when given, `~/.engine-care` otherwise.
    pub fn resolve(state_dir: Option<PathBuf>) -> Self {
        let state_dir = state_dir.unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(DEFAULT_STATE_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
        });
        Self { state_dir }
    }

    pub fn store_path(&self) -> PathBuf {
        self.state_dir.join(STORE_FILE)
    }

    pub fn transitions_path(&self) -> PathBuf {
        self.state_dir.join(TRANSITIONS_FILE)
    }

    /// Opens the services over the file-backed store.
    pub fn open(&self) -> Result<Services, ConfigError> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::open(self.store_path())?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let mut machine = WorkOrderStateMachine::new(store.clone(), clock.clone());
        if let Some(table) = load_transitions(&self.transitions_path())? {
            machine = machine.with_policy(table);
        }

        Ok(Services {
            machine,
            trail: AuditTrail::new(store.clone(), clock.clone()),
            phones: PhoneDirectory::new(store, clock),
        })
    }
}

/// The services every command works through.
pub struct Services {
    pub machine: WorkOrderStateMachine,
    pub trail: AuditTrail,
    pub phones: PhoneDirectory,
}

/// Loads the transition table if the file exists.
fn load_transitions(path: &Path) -> Result<Option<Arc<dyn TransitionPolicy>>, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "No transition table, allowing any move");
        return Ok(None);
    }
    let table = AdjacencyTable::load(path)?;
    info!(path = %path.display(), "Loaded transition table");
    Ok(Some(Arc::new(table)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use care_models::{CustomerId, NewWorkOrder, OrganizationId, UserId, VehicleId, WorkOrderStatus};
    use tempfile::TempDir;

    fn draft(services: &Services, actor: UserId) -> care_models::WorkOrder {
        let request = NewWorkOrder::builder(
            OrganizationId::new(),
            CustomerId::new(),
            VehicleId::new(),
            "Tire rotation",
        )
        .build();
        services.machine.create(request, actor).unwrap()
    }

    #[test]
    fn test_explicit_state_dir_wins() {
        let config = Config::resolve(Some(PathBuf::from("/var/lib/care")));
        assert_eq!(config.store_path(), PathBuf::from("/var/lib/care/store.json"));
        assert_eq!(
            config.transitions_path(),
            PathBuf::from("/var/lib/care/transitions.json")
        );
    }

    #[test]
    fn test_default_state_dir() {
        let config = Config::resolve(None);
        assert!(config.state_dir.ends_with(DEFAULT_STATE_DIR));
    }

    #[test]
    fn test_open_persists_between_runs() {
        let dir = TempDir::new().unwrap();
        let config = Config::resolve(Some(dir.path().to_path_buf()));
        let actor = UserId::new();

        let order = draft(&config.open().unwrap(), actor);

        let reopened = config.open().unwrap();
        assert_eq!(reopened.machine.get(order.id).unwrap().title, "Tire rotation");
    }

    #[test]
    fn test_transition_table_applied() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(TRANSITIONS_FILE),
            r#"{"draft": ["new"]}"#,
        )
        .unwrap();
        let services = Config::resolve(Some(dir.path().to_path_buf())).open().unwrap();
        let actor = UserId::new();
        let order = draft(&services, actor);

        assert!(services
            .machine
            .transition(order.id, WorkOrderStatus::Completed, actor, None)
            .is_err());
        services
            .machine
            .transition(order.id, WorkOrderStatus::New, actor, None)
            .unwrap();
    }

    #[test]
    fn test_bad_transition_table_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(TRANSITIONS_FILE), r#"{"draft": ["shipped"]}"#).unwrap();

        let result = Config::resolve(Some(dir.path().to_path_buf())).open();
        assert!(matches!(result, Err(ConfigError::Transitions(_))));
    }
}
