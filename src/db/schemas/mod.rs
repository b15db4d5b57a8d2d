//! Database schemas
//!
//! Document structures for administrators and guests.

mod admin;
mod guest;

use serde::{Deserialize, Serialize};

pub use admin::{AdminDoc, ADMIN_COLLECTION};
pub use guest::{GuestDoc, GuestFilter, GuestPatch, RsvpStatus, GUEST_COLLECTION};

/// Preferred language for administrators and guests
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
    Ar,
}
