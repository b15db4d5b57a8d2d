//! Administrator document schema
//!
//! Stores the administrator credential: a unique identity (email) and an
//! Argon2 password hash.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Language;

/// Collection name for administrators
pub const ADMIN_COLLECTION: &str = "admins";

/// Administrator document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AdminDoc {
    /// UUID v4, used as the token subject
    #[serde(rename = "_id")]
    pub id: String,

    /// Login identity (email). Unique, never changes.
    pub identity: String,

    /// Argon2 PHC hash string
    pub password_hash: String,

    /// Display name
    pub name: String,

    #[serde(default)]
    pub language: Language,

    pub created_at: DateTime,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime>,
}

impl AdminDoc {
    /// Create a new administrator document with a fresh id
    pub fn new(identity: String, password_hash: String, name: String, language: Language) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            identity,
            password_hash,
            name,
            language,
            created_at: DateTime::now(),
            last_login_at: None,
        }
    }
}

impl IntoIndexes for AdminDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "identity": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("identity_unique".to_string())
                    .build(),
            ),
        )]
    }

    fn unique_fields() -> &'static [(&'static str, &'static str)] {
        &[("identity_unique", "identity")]
    }
}
