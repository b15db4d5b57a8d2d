//! Health check endpoint
//!
//! Liveness only: 200 whenever the process is serving requests.

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
    pub built_at: &'static str,
    /// Which store backs this instance (`mongodb` or `memory`)
    pub store: &'static str,
    pub mode: &'static str,
}

/// GET /health
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("GIT_COMMIT_SHORT"),
            built_at: env!("BUILD_TIMESTAMP"),
            store: state.store_kind,
            mode: if state.args.dev_mode { "development" } else { "production" },
        },
    )
}
