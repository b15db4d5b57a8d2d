//! Services behind the HTTP routes

pub mod accounts;
pub mod guests;

pub use accounts::{AccountService, Registration, Session};
pub use guests::{
    create_guest, delete_guest, get_guest, guest_stats, list_guests, lookup_by_code,
    submit_response, update_guest, GuestChanges, GuestStats, NewGuest, RsvpSubmission,
    DEFAULT_CODE_ATTEMPTS,
};
