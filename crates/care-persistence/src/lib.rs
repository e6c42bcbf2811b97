//! Persistence layer for Engine Care.
//!
//! The services in this workspace talk to storage only through the
//! [`Store`] and [`Transaction`] traits. A transaction either commits every
//! write it staged or none of them; [`run_in_tx`] wraps a closure so that an
//! `Err` anywhere inside leaves the committed state untouched.
//!
//! [`MemoryStore`] is the bundled implementation: optimistic concurrency
//! with read-set validation at commit, unique constraints on E.164 numbers,
//! owner/phone pairs and item positions, and optional crash-safe JSON
//! snapshots (write to temp file, then rename).
//!
//! # Example
//!
//! ```no_run
//! use care_persistence::{run_in_tx, MemoryStore, PersistenceError};
//!
//! let store = MemoryStore::open("/tmp/engine-care/store.json").unwrap();
//! let orders = run_in_tx(&store, |tx| tx.work_orders()).unwrap();
//! println!("{} work orders", orders.len());
//! # Ok::<(), PersistenceError>(())
//! ```

pub mod atomic;
pub mod error;
pub mod memory;
pub mod store;
mod tables;

pub use error::{PersistenceError, Result};
pub use memory::MemoryStore;
pub use store::{run_in_tx, Store, Transaction};
