//! Phone number directory for Engine Care.
//!
//! Users and customers share one table of phone numbers keyed by canonical
//! E.164 form. [`PhoneDirectory`] registers numbers for an owner, keeps at
//! most one primary number per owner, and maintains the owner links. Every
//! operation runs as one store transaction. Owners registering the same
//! number at once end up sharing one row; a concurrent writer to the same
//! owner's links surfaces as a retryable [`PhoneError::Persistence`]
//! conflict.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use care_models::{Owner, SystemClock, UserId};
//! use care_persistence::MemoryStore;
//! use care_phones::PhoneDirectory;
//!
//! let directory = PhoneDirectory::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
//! let owner = Owner::User(UserId::new());
//!
//! directory.associate_number(owner, "+1", "(555) 123-4567", true).unwrap();
//! for entry in directory.list_for_owner(owner).unwrap() {
//!     println!("{} primary={}", entry.phone.e164, entry.link.is_primary);
//! }
//! ```

pub mod canonical;
pub mod directory;
pub mod error;

pub use canonical::{canonicalize, CanonicalNumber};
pub use directory::{OwnerPhone, PhoneDirectory};
pub use error::{PhoneError, Result};
