//! Shared types

mod error;

pub use error::{GatewayError, Result};
