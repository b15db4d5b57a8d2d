//! Guest records and the public RSVP flow
//!
//! Guests are created by administrators. Creation draws an access code and
//! inserts; if the unique index on `access_code` rejects the insert, a new
//! code is drawn and the insert retried, up to `max_attempts` times. No lock
//! is taken and no existence check is made first, so concurrent creations
//! are serialized by the index alone.
//!
//! The public side (`lookup_by_code`, `submit_response`) authenticates by
//! access code only.

use bson::DateTime;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, info};

use crate::auth::access_code::mask_access_code;
use crate::auth::{generate_access_code, is_valid_access_code, normalize_access_code};
use crate::db::schemas::{GuestDoc, GuestFilter, GuestPatch, Language, RsvpStatus};
use crate::db::GuestStore;
use crate::types::GatewayError;

/// Default number of insert attempts when allocating an access code
pub const DEFAULT_CODE_ATTEMPTS: u32 = 5;

/// Administrator input for a new guest
#[derive(Debug, Clone, Deserialize)]
pub struct NewGuest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub plus_one_allowed: bool,
    #[serde(default)]
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub table_number: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewGuest {
    fn into_doc(self, id: String, access_code: String) -> GuestDoc {
        let now = DateTime::now();
        GuestDoc {
            id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email,
            phone: self.phone,
            group_name: self.group_name,
            access_code,
            rsvp_status: RsvpStatus::Pending,
            plus_one_allowed: self.plus_one_allowed,
            plus_one_name: None,
            plus_one_attending: false,
            dietary_restrictions: self.dietary_restrictions,
            message: None,
            language: self.language,
            table_number: self.table_number,
            notes: self.notes,
            responded_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Administrator edits to an existing guest
///
/// An absent field is left alone. For the nullable fields an explicit
/// `null` clears the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuestChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub group_name: Option<Option<String>>,
    pub plus_one_allowed: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub dietary_restrictions: Option<Option<String>>,
    pub language: Option<Language>,
    #[serde(default, deserialize_with = "present")]
    pub table_number: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    pub rsvp_status: Option<RsvpStatus>,
}

/// Marks a field that appeared in the input, `null` included
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<GuestChanges> for GuestPatch {
    fn from(changes: GuestChanges) -> Self {
        GuestPatch {
            first_name: changes.first_name.map(|name| name.trim().to_string()),
            last_name: changes.last_name.map(|name| name.trim().to_string()),
            email: changes.email,
            phone: changes.phone,
            group_name: changes.group_name,
            plus_one_allowed: changes.plus_one_allowed,
            dietary_restrictions: changes.dietary_restrictions,
            language: changes.language,
            table_number: changes.table_number,
            notes: changes.notes,
            rsvp_status: changes.rsvp_status,
            ..Default::default()
        }
    }
}

/// Guest counts for the administrator dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GuestStats {
    pub total: usize,
    pub attending: usize,
    pub not_attending: usize,
    pub pending: usize,
    /// Attending guests bringing a plus-one
    pub plus_ones: usize,
    /// Attending guests plus their plus-ones
    pub total_attending: usize,
}

/// Guest-submitted RSVP answer
#[derive(Debug, Clone, Deserialize)]
pub struct RsvpSubmission {
    pub rsvp_code: String,
    pub rsvp_status: RsvpStatus,
    #[serde(default)]
    pub plus_one_name: Option<String>,
    #[serde(default)]
    pub plus_one_attending: bool,
    #[serde(default)]
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Create a guest with a freshly generated access code
pub async fn create_guest(
    store: &dyn GuestStore,
    new_guest: NewGuest,
    max_attempts: u32,
) -> Result<GuestDoc, GatewayError> {
    create_guest_with(store, new_guest, max_attempts, generate_access_code).await
}

/// Create a guest, drawing codes from `next_code` until one is accepted
pub async fn create_guest_with<F>(
    store: &dyn GuestStore,
    new_guest: NewGuest,
    max_attempts: u32,
    mut next_code: F,
) -> Result<GuestDoc, GatewayError>
where
    F: FnMut() -> String,
{
    if new_guest.first_name.trim().is_empty() || new_guest.last_name.trim().is_empty() {
        return Err(GatewayError::BadRequest(
            "Missing required fields: first_name, last_name".into(),
        ));
    }

    let id = uuid::Uuid::new_v4().to_string();

    for attempt in 1..=max_attempts {
        let guest = new_guest.clone().into_doc(id.clone(), next_code());

        match store.insert(guest.clone()).await {
            Ok(()) => {
                info!(
                    "Created guest {} with code {} (attempt {})",
                    guest.id,
                    mask_access_code(&guest.access_code),
                    attempt
                );
                return Ok(guest);
            }
            Err(GatewayError::UniqueConstraintViolation { field: "access_code" }) => {
                debug!("Access code collision on attempt {}, retrying", attempt);
            }
            Err(e) => return Err(e),
        }
    }

    error!(
        "Could not allocate a unique access code after {} attempts",
        max_attempts
    );
    Err(GatewayError::Internal(format!(
        "Could not allocate a unique access code after {} attempts",
        max_attempts
    )))
}

/// Fetch a guest by id
pub async fn get_guest(store: &dyn GuestStore, id: &str) -> Result<GuestDoc, GatewayError> {
    store
        .find_by_id(id)
        .await?
        .ok_or_else(|| GatewayError::NotFound("Guest not found".into()))
}

/// List guests matching `filter`, ordered by name
pub async fn list_guests(store: &dyn GuestStore, filter: &GuestFilter) -> Result<Vec<GuestDoc>, GatewayError> {
    store.list(filter).await
}

/// Tally RSVP answers across all guests
pub async fn guest_stats(store: &dyn GuestStore) -> Result<GuestStats, GatewayError> {
    let guests = store.list(&GuestFilter::default()).await?;

    let mut stats = GuestStats {
        total: guests.len(),
        ..Default::default()
    };
    for guest in &guests {
        match guest.rsvp_status {
            RsvpStatus::Attending => {
                stats.attending += 1;
                if guest.plus_one_attending {
                    stats.plus_ones += 1;
                }
            }
            RsvpStatus::NotAttending => stats.not_attending += 1,
            RsvpStatus::Pending => stats.pending += 1,
        }
    }
    stats.total_attending = stats.attending + stats.plus_ones;

    Ok(stats)
}

/// Apply administrator edits. The access code is never touched.
///
/// Only the fields named in `changes` are written, so an RSVP submitted
/// at the same moment keeps its answer.
pub async fn update_guest(
    store: &dyn GuestStore,
    id: &str,
    changes: GuestChanges,
) -> Result<GuestDoc, GatewayError> {
    let patch = GuestPatch::from(changes);

    let blank = |name: &Option<String>| name.as_deref().is_some_and(str::is_empty);
    if blank(&patch.first_name) || blank(&patch.last_name) {
        return Err(GatewayError::BadRequest("Guest name must not be empty".into()));
    }

    if patch.is_empty() {
        return get_guest(store, id).await;
    }

    store
        .update(id, &patch)
        .await?
        .ok_or_else(|| GatewayError::NotFound("Guest not found".into()))
}

/// Delete a guest; its access code stops working immediately
pub async fn delete_guest(store: &dyn GuestStore, id: &str) -> Result<(), GatewayError> {
    if store.delete(id).await? {
        info!("Deleted guest {}", id);
        Ok(())
    } else {
        Err(GatewayError::NotFound("Guest not found".into()))
    }
}

/// Find a guest by access code, ignoring case
pub async fn lookup_by_code(store: &dyn GuestStore, raw_code: &str) -> Result<GuestDoc, GatewayError> {
    let code = normalize_access_code(raw_code);
    if !is_valid_access_code(&code) {
        return Err(GatewayError::NotFound("RSVP code not found".into()));
    }

    store
        .find_by_access_code(&code)
        .await?
        .ok_or_else(|| GatewayError::NotFound("RSVP code not found".into()))
}

/// Record a guest's answer
///
/// Plus-one details are only stored for guests allowed a plus-one.
pub async fn submit_response(
    store: &dyn GuestStore,
    submission: RsvpSubmission,
) -> Result<GuestDoc, GatewayError> {
    let guest = lookup_by_code(store, &submission.rsvp_code).await?;

    let mut patch = GuestPatch {
        rsvp_status: Some(submission.rsvp_status),
        dietary_restrictions: Some(submission.dietary_restrictions),
        message: Some(submission.message),
        responded_at: Some(DateTime::now()),
        ..Default::default()
    };
    if guest.plus_one_allowed {
        patch.plus_one_name = Some(submission.plus_one_name);
        patch.plus_one_attending = Some(submission.plus_one_attending);
    }

    let updated = store
        .update(&guest.id, &patch)
        .await?
        .ok_or_else(|| GatewayError::NotFound("RSVP code not found".into()))?;

    info!(
        "RSVP recorded for code {}: {:?}",
        mask_access_code(&updated.access_code),
        updated.rsvp_status
    );
    Ok(updated)
}
