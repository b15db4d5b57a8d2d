//! HTTP routes for the RSVP gateway
//!
//! Handlers are generic over the request body so they run unchanged on
//! `hyper::body::Incoming` in the server and on `Full<Bytes>` in tests.

pub mod auth_routes;
pub mod guests;
pub mod health;
pub mod rsvp;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use hyper::{Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::error;

use crate::auth::BEARER_CHALLENGE;
use crate::types::GatewayError;

pub use auth_routes::handle_auth_request;
pub use guests::handle_guest_request;
pub use health::health_check;
pub use rsvp::handle_rsvp_request;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest accepted JSON request body
const MAX_BODY_BYTES: usize = 10 * 1024;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, hyper::header::HeaderValue::from_static("application/json"));
    response
}

/// JSON error body; 401s carry the bearer challenge
pub fn error_response(err: &GatewayError) -> Response<BoxBody> {
    let status = err.status_code();
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }

    let mut response = json_response(
        status,
        &ErrorResponse {
            error: err.public_message(),
            code: Some(err.code().to_string()),
        },
    );

    if err.needs_challenge() {
        response.headers_mut().insert(
            WWW_AUTHENTICATE,
            hyper::header::HeaderValue::from_static(BEARER_CHALLENGE),
        );
    }

    response
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
            code: None,
        },
    )
}

pub fn not_found() -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: "Not found".into(),
            code: None,
        },
    )
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Read and decode a JSON body of at most `MAX_BODY_BYTES`
pub async fn parse_json_body<B, T>(req: Request<B>) -> Result<T, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    T: DeserializeOwned,
{
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| GatewayError::Http(format!("Failed to read body: {}", e)))?;

    serde_json::from_slice(&body.to_bytes())
        .map_err(|e| GatewayError::BadRequest(format!("Invalid JSON: {}", e)))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers for driving handlers in tests

    use super::*;
    use std::sync::Arc;

    use crate::auth::{SessionTokens, DEFAULT_TOKEN_TTL};
    use crate::config::Args;
    use crate::db::MemoryStore;
    use crate::server::AppState;
    use clap::Parser;

    pub const TEST_SECRET: &str = "route-test-secret-at-least-32-characters";

    pub fn test_state() -> Arc<AppState> {
        let args = Args::parse_from(["rsvp-gateway", "--jwt-secret", TEST_SECRET]);
        let tokens = Arc::new(SessionTokens::new(TEST_SECRET, DEFAULT_TOKEN_TTL).unwrap());
        let store = Arc::new(MemoryStore::new());
        Arc::new(AppState::new(args, tokens, store.clone(), store, "memory"))
    }

    pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    pub fn empty_request(method: &str, uri: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    pub fn with_bearer(mut req: Request<Full<Bytes>>, token: &str) -> Request<Full<Bytes>> {
        req.headers_mut().insert(
            hyper::header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        req
    }

    pub async fn body_json(response: Response<BoxBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
