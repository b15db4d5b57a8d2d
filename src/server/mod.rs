//! HTTP server for the RSVP gateway

pub mod http;

pub use http::{dispatch, run, AppState};
