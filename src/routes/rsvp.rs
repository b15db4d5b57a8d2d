//! Public RSVP routes
//!
//! - GET  /api/rsvp/lookup/{code} - Guest's RSVP view
//! - POST /api/rsvp/submit        - Record the guest's answer
//!
//! No session here: holding the access code is the whole credential.

use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::db::schemas::{GuestDoc, Language, RsvpStatus};
use crate::routes::{
    error_response, json_response, method_not_allowed, not_found, parse_json_body, BoxBody,
    SuccessResponse,
};
use crate::server::AppState;
use crate::services::{self, RsvpSubmission};
use crate::types::GatewayError;

/// What a guest sees about their own record
#[derive(Debug, Serialize)]
pub struct RsvpLookupResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub rsvp_status: RsvpStatus,
    pub plus_one_allowed: bool,
    pub plus_one_name: Option<String>,
    pub plus_one_attending: bool,
    pub dietary_restrictions: Option<String>,
    pub message: Option<String>,
    pub language: Language,
}

impl From<GuestDoc> for RsvpLookupResponse {
    fn from(guest: GuestDoc) -> Self {
        Self {
            id: guest.id,
            first_name: guest.first_name,
            last_name: guest.last_name,
            rsvp_status: guest.rsvp_status,
            plus_one_allowed: guest.plus_one_allowed,
            plus_one_name: guest.plus_one_name,
            plus_one_attending: guest.plus_one_attending,
            dietary_restrictions: guest.dietary_restrictions,
            message: guest.message,
            language: guest.language,
        }
    }
}

async fn handle_lookup(code: &str, state: Arc<AppState>) -> Result<Response<BoxBody>, GatewayError> {
    let guest = services::lookup_by_code(state.guests.as_ref(), code).await?;
    Ok(json_response(StatusCode::OK, &RsvpLookupResponse::from(guest)))
}

async fn handle_submit<B>(req: Request<B>, state: Arc<AppState>) -> Result<Response<BoxBody>, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let submission: RsvpSubmission = parse_json_body(req).await?;
    services::submit_response(state.guests.as_ref(), submission).await?;

    Ok(json_response(
        StatusCode::OK,
        &SuccessResponse {
            success: true,
            message: "RSVP submitted successfully".into(),
        },
    ))
}

/// Handle public RSVP requests.
///
/// Returns Some(response) if request was handled, None if not an RSVP route.
pub async fn handle_rsvp_request<B>(req: Request<B>, state: Arc<AppState>) -> Option<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    if !path.starts_with("/api/rsvp/") {
        return None;
    }

    let method = req.method().clone();
    let result = if let Some(code) = path.strip_prefix("/api/rsvp/lookup/") {
        match method {
            Method::GET if !code.contains('/') => handle_lookup(code, state).await,
            Method::GET => Ok(not_found()),
            _ => Ok(method_not_allowed()),
        }
    } else if path == "/api/rsvp/submit" {
        match method {
            Method::POST => handle_submit(req, state).await,
            _ => Ok(method_not_allowed()),
        }
    } else {
        Ok(not_found())
    };

    Some(result.unwrap_or_else(|e| error_response(&e)))
}
