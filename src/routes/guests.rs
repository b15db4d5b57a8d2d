//! Administrator guest routes
//!
//! - GET    /api/guests       - List guests (`search`, `rsvp_status`, `group_name`)
//! - POST   /api/guests       - Create a guest and allocate its access code
//! - GET    /api/guests/stats - RSVP counts
//! - GET    /api/guests/{id}  - Fetch a guest
//! - PATCH  /api/guests/{id}  - Edit administrative fields
//! - DELETE /api/guests/{id}  - Remove a guest and retire its code
//!
//! Every route here sits behind the access guard.

use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::db::schemas::{GuestDoc, GuestFilter, Language, RsvpStatus};
use crate::routes::{
    empty_body, error_response, json_response, method_not_allowed, not_found, parse_json_body,
    BoxBody,
};
use crate::server::AppState;
use crate::services::{self, GuestChanges, NewGuest};
use crate::types::GatewayError;

/// Full guest view for administrators
#[derive(Debug, Serialize)]
pub struct GuestResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub group_name: Option<String>,
    pub rsvp_code: String,
    pub rsvp_status: RsvpStatus,
    pub plus_one_allowed: bool,
    pub plus_one_name: Option<String>,
    pub plus_one_attending: bool,
    pub dietary_restrictions: Option<String>,
    pub message: Option<String>,
    pub language: Language,
    pub table_number: Option<i32>,
    pub notes: Option<String>,
    pub responded_at: Option<String>,
    pub created_at: String,
}

impl From<GuestDoc> for GuestResponse {
    fn from(guest: GuestDoc) -> Self {
        Self {
            id: guest.id,
            first_name: guest.first_name,
            last_name: guest.last_name,
            email: guest.email,
            phone: guest.phone,
            group_name: guest.group_name,
            rsvp_code: guest.access_code,
            rsvp_status: guest.rsvp_status,
            plus_one_allowed: guest.plus_one_allowed,
            plus_one_name: guest.plus_one_name,
            plus_one_attending: guest.plus_one_attending,
            dietary_restrictions: guest.dietary_restrictions,
            message: guest.message,
            language: guest.language,
            table_number: guest.table_number,
            notes: guest.notes,
            responded_at: guest.responded_at.and_then(|t| t.try_to_rfc3339_string().ok()),
            created_at: guest.created_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

/// GET /api/guests
async fn handle_list(query: Option<&str>, state: Arc<AppState>) -> Result<Response<BoxBody>, GatewayError> {
    let filter: GuestFilter = serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| GatewayError::BadRequest(format!("Invalid query parameters: {}", e)))?;

    let guests: Vec<GuestResponse> = services::list_guests(state.guests.as_ref(), &filter)
        .await?
        .into_iter()
        .map(GuestResponse::from)
        .collect();
    Ok(json_response(StatusCode::OK, &guests))
}

/// GET /api/guests/stats
async fn handle_stats(state: Arc<AppState>) -> Result<Response<BoxBody>, GatewayError> {
    let stats = services::guest_stats(state.guests.as_ref()).await?;
    Ok(json_response(StatusCode::OK, &stats))
}

/// POST /api/guests
async fn handle_create<B>(req: Request<B>, state: Arc<AppState>) -> Result<Response<BoxBody>, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let new_guest: NewGuest = parse_json_body(req).await?;
    let guest = services::create_guest(
        state.guests.as_ref(),
        new_guest,
        state.args.access_code_attempts,
    )
    .await?;

    Ok(json_response(StatusCode::CREATED, &GuestResponse::from(guest)))
}

/// GET /api/guests/{id}
async fn handle_get(id: &str, state: Arc<AppState>) -> Result<Response<BoxBody>, GatewayError> {
    let guest = services::get_guest(state.guests.as_ref(), id).await?;
    Ok(json_response(StatusCode::OK, &GuestResponse::from(guest)))
}

/// PATCH /api/guests/{id}
async fn handle_update<B>(
    id: &str,
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let changes: GuestChanges = parse_json_body(req).await?;
    let guest = services::update_guest(state.guests.as_ref(), id, changes).await?;
    Ok(json_response(StatusCode::OK, &GuestResponse::from(guest)))
}

/// DELETE /api/guests/{id}
async fn handle_delete(id: &str, state: Arc<AppState>) -> Result<Response<BoxBody>, GatewayError> {
    services::delete_guest(state.guests.as_ref(), id).await?;

    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    Ok(response)
}

async fn route<B>(req: Request<B>, state: Arc<AppState>, path: &str) -> Result<Response<BoxBody>, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let current = state.guard.authenticate(req.headers()).await?;
    debug!("Guest route {} {} by {}", req.method(), path, current.admin.identity);

    let rest = path.trim_start_matches("/api/guests").trim_matches('/');
    let method = req.method().clone();

    match (method, rest) {
        (Method::GET, "") => handle_list(req.uri().query(), state).await,
        (Method::POST, "") => handle_create(req, state).await,
        (_, "") => Ok(method_not_allowed()),
        (Method::GET, "stats") => handle_stats(state).await,
        (_, "stats") => Ok(method_not_allowed()),
        (Method::GET, id) if !id.contains('/') => handle_get(id, state).await,
        (Method::PATCH, id) if !id.contains('/') => handle_update(id, req, state).await,
        (Method::DELETE, id) if !id.contains('/') => handle_delete(id, state).await,
        (_, id) if !id.contains('/') => Ok(method_not_allowed()),
        _ => Ok(not_found()),
    }
}

/// Handle guest HTTP requests.
///
/// Returns Some(response) if request was handled, None if not a guest route.
pub async fn handle_guest_request<B>(req: Request<B>, state: Arc<AppState>) -> Option<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    if path != "/api/guests" && !path.starts_with("/api/guests/") {
        return None;
    }

    Some(
        route(req, state, &path)
            .await
            .unwrap_or_else(|e| error_response(&e)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::is_valid_access_code;
    use crate::routes::handle_auth_request;
    use crate::routes::test_support::*;
    use serde_json::json;

    async fn admin_token(state: &Arc<AppState>) -> String {
        handle_auth_request(
            json_request(
                "POST",
                "/api/auth/register",
                json!({ "email": "admin@example.com", "password": "hunter2", "name": "Admin" }),
            ),
            Arc::clone(state),
        )
        .await
        .unwrap();

        let response = handle_auth_request(
            json_request(
                "POST",
                "/api/auth/login",
                json!({ "email": "admin@example.com", "password": "hunter2" }),
            ),
            Arc::clone(state),
        )
        .await
        .unwrap();
        body_json(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_create_and_fetch_guest() {
        let state = test_state();
        let token = admin_token(&state).await;

        let response = handle_guest_request(
            with_bearer(
                json_request(
                    "POST",
                    "/api/guests",
                    json!({ "first_name": "Amina", "last_name": "Benali", "plus_one_allowed": true }),
                ),
                &token,
            ),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert!(is_valid_access_code(created["rsvp_code"].as_str().unwrap()));
        assert_eq!(created["rsvp_status"], "pending");

        let uri = format!("/api/guests/{}", created["id"].as_str().unwrap());
        let response = handle_guest_request(
            with_bearer(empty_request("GET", &uri), &token),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["rsvp_code"], created["rsvp_code"]);
    }

    #[tokio::test]
    async fn test_patch_does_not_touch_code() {
        let state = test_state();
        let token = admin_token(&state).await;

        let response = handle_guest_request(
            with_bearer(
                json_request(
                    "POST",
                    "/api/guests",
                    json!({ "first_name": "Amina", "last_name": "Benali" }),
                ),
                &token,
            ),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        let created = body_json(response).await;

        let uri = format!("/api/guests/{}", created["id"].as_str().unwrap());
        let response = handle_guest_request(
            with_bearer(
                json_request(
                    "PATCH",
                    &uri,
                    json!({ "table_number": 3, "rsvp_code": "AAAAAAAA" }),
                ),
                &token,
            ),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["table_number"], 3);
        assert_eq!(updated["rsvp_code"], created["rsvp_code"]);
    }

    #[tokio::test]
    async fn test_guest_routes_require_token() {
        let state = test_state();
        let response = handle_guest_request(
            json_request(
                "POST",
                "/api/guests",
                json!({ "first_name": "Amina", "last_name": "Benali" }),
            ),
            state,
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_guest() {
        let state = test_state();
        let token = admin_token(&state).await;

        let response = handle_guest_request(
            with_bearer(empty_request("GET", "/api/guests/does-not-exist"), &token),
            state,
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn create(state: &Arc<AppState>, token: &str, body: serde_json::Value) -> serde_json::Value {
        let response = handle_guest_request(
            with_bearer(json_request("POST", "/api/guests", body), token),
            Arc::clone(state),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let state = test_state();
        let token = admin_token(&state).await;
        create(&state, &token, json!({ "first_name": "Amina", "last_name": "Benali", "group_name": "Family" })).await;
        create(&state, &token, json!({ "first_name": "Karim", "last_name": "Haddad", "group_name": "Friends" })).await;

        let response = handle_guest_request(
            with_bearer(empty_request("GET", "/api/guests"), &token),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let all = body_json(response).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert_eq!(all[0]["last_name"], "Benali");

        let response = handle_guest_request(
            with_bearer(
                empty_request("GET", "/api/guests?search=hadd&rsvp_status=pending"),
                &token,
            ),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        let found = body_json(response).await;
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["first_name"], "Karim");

        let response = handle_guest_request(
            with_bearer(empty_request("GET", "/api/guests?group_name=Family"), &token),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        let found = body_json(response).await;
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["first_name"], "Amina");

        let response = handle_guest_request(
            with_bearer(empty_request("GET", "/api/guests?rsvp_status=maybe"), &token),
            state,
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let state = test_state();
        let token = admin_token(&state).await;
        create(&state, &token, json!({ "first_name": "Amina", "last_name": "Benali" })).await;

        let response = handle_guest_request(
            with_bearer(empty_request("GET", "/api/guests/stats"), &token),
            state,
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stats = body_json(response).await;
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["pending"], 1);
        assert_eq!(stats["total_attending"], 0);
    }

    #[tokio::test]
    async fn test_delete_guest() {
        let state = test_state();
        let token = admin_token(&state).await;
        let created = create(&state, &token, json!({ "first_name": "Amina", "last_name": "Benali" })).await;
        let uri = format!("/api/guests/{}", created["id"].as_str().unwrap());

        let response = handle_guest_request(
            with_bearer(empty_request("DELETE", &uri), &token),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let code = created["rsvp_code"].as_str().unwrap();
        let err = services::lookup_by_code(state.guests.as_ref(), code).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));

        let response = handle_guest_request(
            with_bearer(empty_request("DELETE", &uri), &token),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Deleting needs a session like every other guest route
        let response = handle_guest_request(empty_request("DELETE", &uri), state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
