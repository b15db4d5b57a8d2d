//! In-memory store
//!
//! Used in dev mode when MongoDB is unavailable, and in tests. Each unique
//! field has its own index map; an insert first claims its key through the
//! `DashMap` entry API, which locks the shard, so two concurrent inserts of
//! the same value cannot both win.

use async_trait::async_trait;
use bson::DateTime;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::db::schemas::{AdminDoc, GuestDoc, GuestFilter, GuestPatch};
use crate::db::{AdminStore, GuestStore};
use crate::types::GatewayError;

/// Concurrent in-memory administrator and guest store
#[derive(Default)]
pub struct MemoryStore {
    admins: DashMap<String, AdminDoc>,
    /// identity -> admin id
    admin_identities: DashMap<String, String>,
    guests: DashMap<String, GuestDoc>,
    /// access code -> guest id
    guest_codes: DashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of guest records
    pub fn guest_count(&self) -> usize {
        self.guests.len()
    }
}

/// Claim `key` in a unique index, or report which field collided
fn claim(
    index: &DashMap<String, String>,
    key: &str,
    id: &str,
    field: &'static str,
) -> Result<(), GatewayError> {
    match index.entry(key.to_string()) {
        Entry::Occupied(_) => Err(GatewayError::UniqueConstraintViolation { field }),
        Entry::Vacant(slot) => {
            slot.insert(id.to_string());
            Ok(())
        }
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<AdminDoc>, GatewayError> {
        let Some(id) = self.admin_identities.get(identity).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.admins.get(&id).map(|admin| admin.clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AdminDoc>, GatewayError> {
        Ok(self.admins.get(id).map(|admin| admin.clone()))
    }

    async fn insert(&self, admin: AdminDoc) -> Result<(), GatewayError> {
        if self.admins.contains_key(&admin.id) {
            return Err(GatewayError::UniqueConstraintViolation { field: "_id" });
        }
        claim(&self.admin_identities, &admin.identity, &admin.id, "identity")?;
        self.admins.insert(admin.id.clone(), admin);
        Ok(())
    }

    async fn update(&self, admin: &AdminDoc) -> Result<(), GatewayError> {
        match self.admins.get_mut(&admin.id) {
            Some(mut stored) if stored.identity == admin.identity => {
                *stored = admin.clone();
                Ok(())
            }
            _ => Err(GatewayError::NotFound("Administrator not found".into())),
        }
    }
}

#[async_trait]
impl GuestStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<GuestDoc>, GatewayError> {
        Ok(self.guests.get(id).map(|guest| guest.clone()))
    }

    async fn find_by_access_code(&self, code: &str) -> Result<Option<GuestDoc>, GatewayError> {
        let Some(id) = self.guest_codes.get(code).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.guests.get(&id).map(|guest| guest.clone()))
    }

    async fn list(&self, filter: &GuestFilter) -> Result<Vec<GuestDoc>, GatewayError> {
        let mut guests: Vec<GuestDoc> = self
            .guests
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        guests.sort_by(|a, b| {
            (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name))
        });
        Ok(guests)
    }

    async fn insert(&self, guest: GuestDoc) -> Result<(), GatewayError> {
        if self.guests.contains_key(&guest.id) {
            return Err(GatewayError::UniqueConstraintViolation { field: "_id" });
        }
        claim(&self.guest_codes, &guest.access_code, &guest.id, "access_code")?;
        self.guests.insert(guest.id.clone(), guest);
        Ok(())
    }

    async fn update(&self, id: &str, patch: &GuestPatch) -> Result<Option<GuestDoc>, GatewayError> {
        // The shard stays locked while the patch is applied
        Ok(self.guests.get_mut(id).map(|mut stored| {
            patch.apply(&mut stored, DateTime::now());
            stored.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, GatewayError> {
        let Some((_, guest)) = self.guests.remove(id) else {
            return Ok(false);
        };
        self.guest_codes
            .remove_if(&guest.access_code, |_, owner| owner == id);
        Ok(true)
    }
}
