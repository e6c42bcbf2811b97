//! Phone directory types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{CustomerId, LinkId, PhoneNumberId, UserId};

/// A phone number, unique by its canonical E.164 form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub id: PhoneNumberId,
    /// As entered by the last writer.
    pub raw_number: String,
    /// Canonical `+<country><national>` form; never changes for a row.
    pub e164: String,
    pub country_code: String,
    pub national_number: String,
    pub created_at: DateTime<Utc>,
}

/// The entity a phone number is linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    User(UserId),
    Customer(CustomerId),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::User(id) => write!(f, "user:{}", id),
            Owner::Customer(id) => write!(f, "customer:{}", id),
        }
    }
}

/// Association between one owner and one phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerPhoneLink {
    pub id: LinkId,
    pub owner: Owner,
    pub phone_number_id: PhoneNumberId,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

impl OwnerPhoneLink {
    pub fn new(
        owner: Owner,
        phone_number_id: PhoneNumberId,
        is_primary: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LinkId::new(),
            owner,
            phone_number_id,
            is_primary,
            created_at,
        }
    }
}
