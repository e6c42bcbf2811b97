//! Owner-facing phone directory operations.

use std::sync::Arc;

use care_models::{Clock, LinkId, Owner, OwnerPhoneLink, PhoneNumber, PhoneNumberId};
use care_persistence::{run_in_tx, Store, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::canonical::canonicalize;
use crate::error::{PhoneError, Result};

/// A link together with the phone number it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerPhone {
    pub link: OwnerPhoneLink,
    pub phone: PhoneNumber,
}

/// Registers phone numbers for users and customers.
///
/// Holds no state of its own; every call is one transaction against the
/// store. Conflicts are returned to the caller, never retried here.
pub struct PhoneDirectory {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl PhoneDirectory {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Links a phone number to `owner`, creating the number if needed.
    ///
    /// The number is deduplicated by E.164; an existing row keeps its id and
    /// takes the new raw form. With `is_primary`, every other primary link
    /// of the owner is demoted and this link becomes the primary, whether it
    /// is new or already existed. Without it, an existing link is left as
    /// it is.
    pub fn associate_number(
        &self,
        owner: Owner,
        country_code: &str,
        national_number: &str,
        is_primary: bool,
    ) -> Result<OwnerPhone> {
        let number = canonicalize(country_code, national_number).inspect_err(|e| {
            warn!(owner = %owner, error = %e, "Rejected phone number");
        })?;
        let now = self.clock.now();

        let candidate = PhoneNumber {
            id: PhoneNumberId::new(),
            raw_number: number.raw,
            e164: number.e164,
            country_code: number.country_code,
            national_number: number.national_number,
            created_at: now,
        };

        let entry = run_in_tx(self.store.as_ref(), |tx| {
            let phone = tx.upsert_phone_number(&candidate)?;
            let links = tx.links(owner)?;
            let existing = links
                .iter()
                .find(|link| link.phone_number_id == phone.id)
                .cloned();

            if is_primary {
                let keep = existing.as_ref().map(|link| link.id);
                demote_primaries(tx, &links, keep)?;
            }

            let link = match existing {
                Some(mut link) => {
                    if is_primary && !link.is_primary {
                        link.is_primary = true;
                        tx.put_link(&link)?;
                    }
                    link
                }
                None => {
                    let link = OwnerPhoneLink::new(owner, phone.id, is_primary, now);
                    tx.put_link(&link)?;
                    link
                }
            };

            Ok::<_, PhoneError>(OwnerPhone { link, phone })
        })?;
        let entry = self.reload(owner, entry)?;

        info!(
            owner = %owner,
            e164 = %entry.phone.e164,
            primary = entry.link.is_primary,
            "Associated phone number"
        );
        Ok(entry)
    }

    /// Reads back a just-committed entry. The commit may have linked to a
    /// row another writer created for the same number first.
    fn reload(&self, owner: Owner, entry: OwnerPhone) -> Result<OwnerPhone> {
        let current = run_in_tx(self.store.as_ref(), |tx| {
            let Some(phone) = tx.phone_by_e164(&entry.phone.e164)? else {
                return Ok(None);
            };
            let link = tx
                .links(owner)?
                .into_iter()
                .find(|link| link.id == entry.link.id);
            Ok::<_, PhoneError>(link.map(|link| OwnerPhone { link, phone }))
        })?;
        Ok(current.unwrap_or(entry))
    }

    /// Every number linked to `owner`: the primary first, then oldest link
    /// first.
    pub fn list_for_owner(&self, owner: Owner) -> Result<Vec<OwnerPhone>> {
        let mut entries = run_in_tx(self.store.as_ref(), |tx| {
            let links = tx.links(owner)?;
            let mut entries = Vec::with_capacity(links.len());
            for link in links {
                let phone = tx
                    .phone_number(link.phone_number_id)?
                    .ok_or(PhoneError::MissingPhoneNumber(link.phone_number_id))?;
                entries.push(OwnerPhone { link, phone });
            }
            Ok::<_, PhoneError>(entries)
        })?;

        entries.sort_by(|a, b| {
            b.link
                .is_primary
                .cmp(&a.link.is_primary)
                .then_with(|| a.link.created_at.cmp(&b.link.created_at))
        });

        debug!(owner = %owner, count = entries.len(), "Listed phone numbers");
        Ok(entries)
    }

    /// Makes the owner's link to `phone_number_id` the only primary one.
    pub fn set_primary(&self, owner: Owner, phone_number_id: PhoneNumberId) -> Result<OwnerPhone> {
        let entry = run_in_tx(self.store.as_ref(), |tx| {
            let links = tx.links(owner)?;
            let mut link = find_link(&links, owner, phone_number_id)?;

            demote_primaries(tx, &links, Some(link.id))?;
            if !link.is_primary {
                link.is_primary = true;
                tx.put_link(&link)?;
            }

            let phone = tx
                .phone_number(phone_number_id)?
                .ok_or(PhoneError::MissingPhoneNumber(phone_number_id))?;
            Ok::<_, PhoneError>(OwnerPhone { link, phone })
        })?;

        info!(owner = %owner, e164 = %entry.phone.e164, "Set primary phone number");
        Ok(entry)
    }

    /// Removes the owner's link to a phone number. The number itself stays,
    /// since other owners may share it.
    pub fn dissociate(&self, owner: Owner, phone_number_id: PhoneNumberId) -> Result<()> {
        run_in_tx(self.store.as_ref(), |tx| {
            let links = tx.links(owner)?;
            let link = find_link(&links, owner, phone_number_id)?;
            tx.delete_link(owner, link.id)?;
            Ok::<_, PhoneError>(())
        })?;

        info!(owner = %owner, phone_number_id = %phone_number_id, "Dissociated phone number");
        Ok(())
    }

    /// Drops every link of an owner that no longer exists. Returns how many
    /// links were removed.
    pub fn forget_owner(&self, owner: Owner) -> Result<usize> {
        let removed = run_in_tx(self.store.as_ref(), |tx| {
            let links = tx.links(owner)?;
            for link in &links {
                tx.delete_link(owner, link.id)?;
            }
            Ok::<_, PhoneError>(links.len())
        })?;

        info!(owner = %owner, removed, "Forgot owner phone links");
        Ok(removed)
    }
}

fn find_link(
    links: &[OwnerPhoneLink],
    owner: Owner,
    phone_number_id: PhoneNumberId,
) -> Result<OwnerPhoneLink> {
    links
        .iter()
        .find(|link| link.phone_number_id == phone_number_id)
        .cloned()
        .ok_or(PhoneError::LinkNotFound {
            owner,
            phone_number_id,
        })
}

/// Clears the primary flag on every link except `keep`.
fn demote_primaries(
    tx: &mut dyn Transaction,
    links: &[OwnerPhoneLink],
    keep: Option<LinkId>,
) -> Result<()> {
    for link in links {
        if link.is_primary && Some(link.id) != keep {
            let mut demoted = link.clone();
            demoted.is_primary = false;
            tx.put_link(&demoted)?;
        }
    }
    Ok(())
}
