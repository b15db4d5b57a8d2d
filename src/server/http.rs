//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection.

use hyper::body::{Body, Incoming};
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::{AccessGuard, SessionTokens};
use crate::config::Args;
use crate::db::{AdminStore, GuestStore};
use crate::routes::{self, empty_body, BoxBody};
use crate::services::AccountService;
use crate::types::GatewayError;

/// Shared application state
///
/// Built once at startup and read-only afterwards.
pub struct AppState {
    pub args: Args,
    pub guests: Arc<dyn GuestStore>,
    pub accounts: AccountService,
    pub guard: AccessGuard,
    /// `mongodb` or `memory`, reported by /health
    pub store_kind: &'static str,
}

impl AppState {
    pub fn new(
        args: Args,
        tokens: Arc<SessionTokens>,
        admins: Arc<dyn AdminStore>,
        guests: Arc<dyn GuestStore>,
        store_kind: &'static str,
    ) -> Self {
        let accounts = AccountService::new(Arc::clone(&admins), Arc::clone(&tokens));
        let guard = AccessGuard::new(tokens, admins);

        Self {
            args,
            guests,
            accounts,
            guard,
            store_kind,
        }
    }
}

/// Accept connections until the process exits
pub async fn run(state: Arc<AppState>) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("RSVP gateway listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - tokens are signed with a public dev secret");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, Infallible> {
    debug!("{} {} from {}", req.method(), req.uri().path(), addr);

    let origin = state.args.cors_origin.clone();
    let response = dispatch(req, state).await;
    Ok(with_cors(response, &origin))
}

/// Route a request to the first handler that claims its path
pub async fn dispatch<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if req.method() == Method::OPTIONS {
        return cors_preflight();
    }

    match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            return routes::health_check(state);
        }
        (&Method::GET, "/") => {
            return routes::json_response(
                StatusCode::OK,
                &serde_json::json!({
                    "message": "RSVP gateway",
                    "version": env!("CARGO_PKG_VERSION"),
                }),
            );
        }
        _ => {}
    }

    let path = req.uri().path().to_string();
    if path.starts_with("/api/auth") {
        if let Some(response) = routes::handle_auth_request(req, state).await {
            return response;
        }
    } else if path.starts_with("/api/guests") {
        if let Some(response) = routes::handle_guest_request(req, state).await {
            return response;
        }
    } else if path.starts_with("/api/rsvp/") {
        if let Some(response) = routes::handle_rsvp_request(req, state).await {
            return response;
        }
    }

    routes::not_found()
}

fn cors_preflight() -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

fn with_cors(mut response: Response<BoxBody>, origin: &str) -> Response<BoxBody> {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PATCH, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;

    #[tokio::test]
    async fn test_dispatch_routes() {
        let state = test_state();

        let response = dispatch(empty_request("GET", "/health"), Arc::clone(&state)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = dispatch(empty_request("GET", "/api/guests"), Arc::clone(&state)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = dispatch(empty_request("GET", "/nowhere"), Arc::clone(&state)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = dispatch(empty_request("OPTIONS", "/api/auth/login"), state).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_cors_headers_added() {
        let state = test_state();
        let response = dispatch(empty_request("GET", "/health"), state).await;
        let response = with_cors(response, "https://rsvp.example.com");

        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://rsvp.example.com"
        );
        assert!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .contains("DELETE"));
    }

    #[tokio::test]
    async fn test_accounts_and_guard_share_one_secret() {
        use crate::db::schemas::Language;
        use crate::services::Registration;

        let state = test_state();
        let admin = state
            .accounts
            .register(Registration {
                identity: "admin@example.com".into(),
                password: "hunter2".into(),
                name: "Admin".into(),
                language: Language::En,
            })
            .await
            .unwrap();
        let session = state.accounts.login("admin@example.com", "hunter2").await.unwrap();

        let current = state.guard.authenticate_token(&session.token.token).await.unwrap();
        assert_eq!(current.admin.id, admin.id);
    }
}
