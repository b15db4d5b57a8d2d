//! Storage for administrators and guests
//!
//! Administrators are rewritten whole. Guest records change field by field
//! through `GuestPatch`, so concurrent edits to different fields both land.
//! Uniqueness of administrator identities and guest access codes is the
//! store's job: `insert` fails with `GatewayError::UniqueConstraintViolation`
//! and callers decide whether to retry.

mod memory;
pub mod mongo;
pub mod schemas;

use async_trait::async_trait;

use crate::types::GatewayError;
use schemas::{AdminDoc, GuestDoc, GuestFilter, GuestPatch};

pub use memory::MemoryStore;
pub use mongo::{MongoClient, MongoStore};

/// Administrator records
#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<AdminDoc>, GatewayError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<AdminDoc>, GatewayError>;
    /// Fails with `UniqueConstraintViolation { field: "identity" }` on a taken identity
    async fn insert(&self, admin: AdminDoc) -> Result<(), GatewayError>;
    async fn update(&self, admin: &AdminDoc) -> Result<(), GatewayError>;
}

/// Guest records
#[async_trait]
pub trait GuestStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<GuestDoc>, GatewayError>;
    /// `code` must already be canonical (uppercase)
    async fn find_by_access_code(&self, code: &str) -> Result<Option<GuestDoc>, GatewayError>;
    /// Guests matching `filter`, ordered by last name then first name
    async fn list(&self, filter: &GuestFilter) -> Result<Vec<GuestDoc>, GatewayError>;
    /// Fails with `UniqueConstraintViolation { field: "access_code" }` on a taken code
    async fn insert(&self, guest: GuestDoc) -> Result<(), GatewayError>;
    /// Write the patched fields in one atomic step and return the record as
    /// stored afterwards, or `None` if no guest has this id
    async fn update(&self, id: &str, patch: &GuestPatch) -> Result<Option<GuestDoc>, GatewayError>;
    /// Remove a guest, releasing its access code. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool, GatewayError>;
}
