//! HTTP Routes for Authentication
//!
//! - POST /api/auth/register - Create an administrator
//! - POST /api/auth/login    - Authenticate and get a JWT
//! - GET  /api/auth/me       - Current administrator from the bearer token

use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::schemas::{AdminDoc, Language};
use crate::routes::{error_response, json_response, method_not_allowed, not_found, parse_json_body, BoxBody};
use crate::server::AppState;
use crate::services::Registration;
use crate::types::GatewayError;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub language: Language,
}

impl From<&AdminDoc> for AdminResponse {
    fn from(admin: &AdminDoc) -> Self {
        Self {
            id: admin.id.clone(),
            email: admin.identity.clone(),
            name: admin.name.clone(),
            language: admin.language,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Unix timestamp
    pub expires_at: u64,
    pub user: AdminResponse,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /api/auth/register
async fn handle_register<B>(req: Request<B>, state: Arc<AppState>) -> Result<Response<BoxBody>, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if !state.args.allow_registration {
        return Err(GatewayError::Forbidden("Registration is closed".into()));
    }

    let body: RegisterRequest = parse_json_body(req).await?;
    let admin = state
        .accounts
        .register(Registration {
            identity: body.email,
            password: body.password,
            name: body.name,
            language: body.language,
        })
        .await?;

    Ok(json_response(StatusCode::CREATED, &AdminResponse::from(&admin)))
}

/// POST /api/auth/login
async fn handle_login<B>(req: Request<B>, state: Arc<AppState>) -> Result<Response<BoxBody>, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body: LoginRequest = parse_json_body(req).await?;
    if body.email.is_empty() || body.password.is_empty() {
        return Err(GatewayError::BadRequest(
            "Missing required fields: email, password".into(),
        ));
    }

    let session = state.accounts.login(&body.email, &body.password).await?;

    Ok(json_response(
        StatusCode::OK,
        &LoginResponse {
            access_token: session.token.token,
            token_type: "bearer",
            expires_at: session.token.claims.exp,
            user: AdminResponse::from(&session.admin),
        },
    ))
}

/// GET /api/auth/me
async fn handle_me<B>(req: Request<B>, state: Arc<AppState>) -> Result<Response<BoxBody>, GatewayError> {
    let current = state.guard.authenticate(req.headers()).await?;
    Ok(json_response(StatusCode::OK, &AdminResponse::from(&current.admin)))
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle auth-related HTTP requests.
///
/// Returns Some(response) if request was handled, None if not an auth route.
pub async fn handle_auth_request<B>(req: Request<B>, state: Arc<AppState>) -> Option<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    if !path.starts_with("/api/auth") {
        return None;
    }

    let result = match (req.method().clone(), path.as_str()) {
        (Method::POST, "/api/auth/register") => handle_register(req, state).await,
        (Method::POST, "/api/auth/login") => handle_login(req, state).await,
        (Method::GET, "/api/auth/me") => handle_me(req, state).await,

        (_, "/api/auth/register") | (_, "/api/auth/login") | (_, "/api/auth/me") => {
            Ok(method_not_allowed())
        }

        _ => Ok(not_found()),
    };

    Some(result.unwrap_or_else(|e| error_response(&e)))
}
