//! RSVP gateway - guest invitations and administrator sessions
//!
//! Administrators sign in with a password and a bearer token; guests
//! reach their own invitation with an eight-character access code.

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GatewayError, Result};
