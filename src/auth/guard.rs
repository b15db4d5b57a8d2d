//! Access guard for administrator endpoints
//!
//! Every protected request goes through [`AccessGuard::authenticate`]:
//! 1. take the bearer token from `Authorization`
//! 2. verify signature and expiry (no I/O)
//! 3. load the administrator named by `sub` (one store read)
//!
//! Any failure is `GatewayError::Unauthenticated`. The resolved
//! administrator is returned to the caller and lives only as long as the
//! request that asked for it.

use hyper::header::{HeaderMap, AUTHORIZATION};
use std::sync::Arc;
use tracing::debug;

use crate::auth::jwt::{Claims, SessionTokens};
use crate::db::schemas::AdminDoc;
use crate::db::AdminStore;
use crate::types::GatewayError;

/// Value of the `WWW-Authenticate` challenge on 401 responses
pub const BEARER_CHALLENGE: &str = "Bearer";

/// Administrator resolved for the current request
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub admin: AdminDoc,
    pub claims: Claims,
}

/// Bearer-token gate in front of administrator routes
#[derive(Clone)]
pub struct AccessGuard {
    tokens: Arc<SessionTokens>,
    admins: Arc<dyn AdminStore>,
}

impl AccessGuard {
    pub fn new(tokens: Arc<SessionTokens>, admins: Arc<dyn AdminStore>) -> Self {
        Self { tokens, admins }
    }

    /// Authenticate a request from its headers
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedAdmin, GatewayError> {
        let auth_header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        let token = extract_bearer_token(auth_header).ok_or_else(|| {
            debug!("Rejected request: missing or malformed Authorization header");
            GatewayError::Unauthenticated
        })?;

        self.authenticate_token(token).await
    }

    /// Authenticate a raw token
    pub async fn authenticate_token(&self, token: &str) -> Result<AuthenticatedAdmin, GatewayError> {
        let claims = self.tokens.verify(token).map_err(|rejection| {
            debug!("Rejected token: {}", rejection);
            GatewayError::from(rejection)
        })?;

        match self.admins.find_by_id(&claims.sub).await? {
            Some(admin) => Ok(AuthenticatedAdmin { admin, claims }),
            None => {
                debug!("Rejected token: subject {} no longer exists", claims.sub);
                Err(GatewayError::Unauthenticated)
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively. Raw tokens and other schemes
/// are refused.
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?.trim();
    let (scheme, token) = header.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() || token.contains(' ') {
        return None;
    }

    Some(token)
}
