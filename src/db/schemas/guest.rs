//! Guest document schema
//!
//! `access_code` carries a unique index. It is the only thing standing between
//! the public RSVP endpoints and a guest record, so it is assigned once at
//! insert and never rewritten.

use bson::{doc, Bson, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Language;
use crate::types::GatewayError;

/// Collection name for guests
pub const GUEST_COLLECTION: &str = "guests";

/// Attendance answer
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    #[default]
    Pending,
    Attending,
    NotAttending,
}

/// Guest document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GuestDoc {
    #[serde(rename = "_id")]
    pub id: String,

    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,

    /// Canonical uppercase access code
    pub access_code: String,
    #[serde(default)]
    pub rsvp_status: RsvpStatus,

    #[serde(default)]
    pub plus_one_allowed: bool,
    #[serde(default)]
    pub plus_one_name: Option<String>,
    #[serde(default)]
    pub plus_one_attending: bool,

    #[serde(default)]
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub language: Language,

    #[serde(default)]
    pub table_number: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub responded_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl GuestDoc {
    /// Case-insensitive substring match on first name, last name or email
    fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [Some(&self.first_name), Some(&self.last_name), self.email.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Field-level change to a guest record
///
/// Only the fields that are `Some` are written; everything else in the
/// stored record is left as it is, so two patches touching different fields
/// never undo each other. The nullable fields use `Option<Option<T>>`:
/// `Some(None)` clears the field. There is no way to express a change to
/// `access_code`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuestPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub group_name: Option<Option<String>>,
    pub rsvp_status: Option<RsvpStatus>,
    pub plus_one_allowed: Option<bool>,
    pub plus_one_name: Option<Option<String>>,
    pub plus_one_attending: Option<bool>,
    pub dietary_restrictions: Option<Option<String>>,
    pub message: Option<Option<String>>,
    pub language: Option<Language>,
    pub table_number: Option<Option<i32>>,
    pub notes: Option<Option<String>>,
    pub responded_at: Option<DateTime>,
}

macro_rules! apply_fields {
    ($patch:expr, $guest:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$patch.$field {
                $guest.$field = value.clone();
            }
        )+
    };
}

impl GuestPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to an in-memory record and stamp `updated_at`
    pub fn apply(&self, guest: &mut GuestDoc, now: DateTime) {
        apply_fields!(
            self,
            guest,
            first_name,
            last_name,
            email,
            phone,
            group_name,
            rsvp_status,
            plus_one_allowed,
            plus_one_name,
            plus_one_attending,
            dietary_restrictions,
            message,
            language,
            table_number,
            notes,
        );
        if let Some(responded_at) = self.responded_at {
            guest.responded_at = Some(responded_at);
        }
        guest.updated_at = now;
    }

    /// `$set` body for the patched fields plus `updated_at`
    pub fn to_set_document(&self, now: DateTime) -> Result<Document, GatewayError> {
        let mut set = Document::new();

        put(&mut set, "first_name", &self.first_name)?;
        put(&mut set, "last_name", &self.last_name)?;
        put(&mut set, "email", &self.email)?;
        put(&mut set, "phone", &self.phone)?;
        put(&mut set, "group_name", &self.group_name)?;
        put(&mut set, "rsvp_status", &self.rsvp_status)?;
        put(&mut set, "plus_one_allowed", &self.plus_one_allowed)?;
        put(&mut set, "plus_one_name", &self.plus_one_name)?;
        put(&mut set, "plus_one_attending", &self.plus_one_attending)?;
        put(&mut set, "dietary_restrictions", &self.dietary_restrictions)?;
        put(&mut set, "message", &self.message)?;
        put(&mut set, "language", &self.language)?;
        put(&mut set, "table_number", &self.table_number)?;
        put(&mut set, "notes", &self.notes)?;
        if let Some(responded_at) = self.responded_at {
            set.insert("responded_at", responded_at);
        }
        set.insert("updated_at", now);

        Ok(set)
    }
}

fn put<T: Serialize>(set: &mut Document, key: &str, value: &Option<T>) -> Result<(), GatewayError> {
    if let Some(value) = value {
        let value: Bson = bson::to_bson(value)
            .map_err(|e| GatewayError::Internal(format!("Failed to encode {}: {}", key, e)))?;
        set.insert(key, value);
    }
    Ok(())
}

/// Administrator guest search, all criteria optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuestFilter {
    /// Case-insensitive match on first name, last name or email
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub rsvp_status: Option<RsvpStatus>,
    #[serde(default)]
    pub group_name: Option<String>,
}

impl GuestFilter {
    fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn group(&self) -> Option<&str> {
        self.group_name.as_deref().filter(|s| !s.is_empty())
    }

    pub fn matches(&self, guest: &GuestDoc) -> bool {
        if let Some(term) = self.search_term() {
            if !guest.mentions(term) {
                return false;
            }
        }
        if let Some(status) = self.rsvp_status {
            if guest.rsvp_status != status {
                return false;
            }
        }
        if let Some(group) = self.group() {
            if guest.group_name.as_deref() != Some(group) {
                return false;
            }
        }
        true
    }

    /// MongoDB query for this filter. The search term is matched literally.
    pub fn to_document(&self) -> Result<Document, GatewayError> {
        let mut filter = Document::new();

        if let Some(term) = self.search_term() {
            let pattern = regex::escape(term);
            let clauses: Vec<Bson> = ["first_name", "last_name", "email"]
                .into_iter()
                .map(|field| Bson::Document(doc! { field: { "$regex": &pattern, "$options": "i" } }))
                .collect();
            filter.insert("$or", clauses);
        }
        if let Some(status) = self.rsvp_status {
            let status = bson::to_bson(&status)
                .map_err(|e| GatewayError::Internal(format!("Failed to encode rsvp_status: {}", e)))?;
            filter.insert("rsvp_status", status);
        }
        if let Some(group) = self.group() {
            filter.insert("group_name", group);
        }

        Ok(filter)
    }
}

impl IntoIndexes for GuestDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "access_code": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("access_code_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "last_name": 1, "first_name": 1 },
                Some(
                    IndexOptions::builder()
                        .name("guest_name_index".to_string())
                        .build(),
                ),
            ),
        ]
    }

    fn unique_fields() -> &'static [(&'static str, &'static str)] {
        &[("access_code_unique", "access_code")]
    }
}
