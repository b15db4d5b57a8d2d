//! Session tokens for administrators
//!
//! Tokens are HS256 JWTs carrying `sub`, `iat` and `exp`. Nothing is stored
//! server side: a token is valid exactly when its signature checks out under
//! the configured secret and `iat <= now < exp`. There is no refresh and no
//! revocation; an expired token means logging in again.
//!
//! Security notes:
//! - The secret is injected at construction and never changes afterwards
//! - Default lifetime is 7 days
//! - Rejection reasons are kept for logging only, clients just see 401

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::GatewayError;

/// Default token lifetime (7 days)
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Minimum accepted secret length outside dev mode
pub const MIN_SECRET_LEN: usize = 32;

const DEV_SECRET: &str = "dev-mode-secret-not-for-production-use-123456";

/// Payload stored in the token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Administrator id
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Why a token was refused. Internal only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejection {
    #[error("token expired")]
    Expired,
    #[error("signature mismatch")]
    BadSignature,
    #[error("malformed token")]
    Malformed,
}

impl From<TokenRejection> for GatewayError {
    fn from(_: TokenRejection) -> Self {
        GatewayError::Unauthenticated
    }
}

/// A freshly signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Token issuer and verifier bound to one signing secret
#[derive(Clone)]
pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionTokens {
    /// Create an issuer/verifier
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, GatewayError> {
        if secret.is_empty() {
            return Err(GatewayError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(GatewayError::Config(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} characters"
            )));
        }

        Ok(Self::from_secret(secret, ttl))
    }

    /// Fixed, publicly known secret for dev mode
    pub fn new_dev() -> Self {
        Self::from_secret(DEV_SECRET, DEFAULT_TOKEN_TTL)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn from_secret(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issue a token for `subject` with the configured lifetime
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, GatewayError> {
        self.issue_with_ttl(subject, self.ttl)
    }

    /// Issue a token for `subject` with an explicit lifetime
    pub fn issue_with_ttl(&self, subject: &str, ttl: Duration) -> Result<IssuedToken, GatewayError> {
        self.issue_at(subject, ttl, unix_now())
    }

    fn issue_at(&self, subject: &str, ttl: Duration, now: u64) -> Result<IssuedToken, GatewayError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(ttl.as_secs()),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| GatewayError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> Result<Claims, TokenRejection> {
        self.verify_at(token, unix_now())
    }

    /// Verify a token against an explicit clock reading
    ///
    /// Signature and structure are checked by `jsonwebtoken`; the time window
    /// is checked here with no leeway, so `exp == now` is already expired.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims, TokenRejection> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature => TokenRejection::BadSignature,
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                _ => TokenRejection::Malformed,
            })?;

        if claims.sub.is_empty() || claims.iat > now {
            return Err(TokenRejection::Malformed);
        }

        if claims.exp <= now {
            return Err(TokenRejection::Expired);
        }

        Ok(claims)
    }
}

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    const TEST_SECRET: &str = "test-secret-that-is-at-least-32-characters-long";

    fn test_tokens() -> SessionTokens {
        SessionTokens::new(TEST_SECRET, DEFAULT_TOKEN_TTL).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = test_tokens();

        let issued = tokens.issue("admin-123").unwrap();
        assert_eq!(issued.token.split('.').count(), 3);
        assert_eq!(issued.claims.exp - issued.claims.iat, DEFAULT_TOKEN_TTL.as_secs());

        let claims = tokens.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "admin-123");
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let tokens = test_tokens();
        let issued = tokens.issue_at("admin-123", Duration::ZERO, 1_700_000_000).unwrap();

        assert_eq!(
            tokens.verify_at(&issued.token, 1_700_000_000),
            Err(TokenRejection::Expired)
        );

        let issued = tokens.issue_with_ttl("admin-123", Duration::ZERO).unwrap();
        assert_eq!(tokens.verify(&issued.token), Err(TokenRejection::Expired));
    }

    #[test]
    fn test_expiry_boundary() {
        let tokens = test_tokens();
        let issued = tokens
            .issue_at("admin-123", Duration::from_secs(60), 1_700_000_000)
            .unwrap();

        assert!(tokens.verify_at(&issued.token, 1_700_000_059).is_ok());
        assert_eq!(
            tokens.verify_at(&issued.token, 1_700_000_060),
            Err(TokenRejection::Expired)
        );
    }

    #[test]
    fn test_flipped_signature_byte_fails() {
        let tokens = test_tokens();
        let issued = tokens.issue("admin-123").unwrap();

        let (signed_part, signature) = issued.token.rsplit_once('.').unwrap();
        let mut sig_bytes = URL_SAFE_NO_PAD.decode(signature).unwrap();
        sig_bytes[0] ^= 0x01;
        let forged = format!("{}.{}", signed_part, URL_SAFE_NO_PAD.encode(&sig_bytes));

        assert_eq!(tokens.verify(&forged), Err(TokenRejection::BadSignature));
    }

    #[test]
    fn test_tampered_claims_fail() {
        let tokens = test_tokens();
        let issued = tokens.issue("admin-123").unwrap();

        let parts: Vec<&str> = issued.token.split('.').collect();
        let forged_claims = Claims {
            sub: "admin-999".into(),
            ..issued.claims.clone()
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(tokens.verify(&forged), Err(TokenRejection::BadSignature));
    }

    #[test]
    fn test_wrong_secret() {
        let issued = test_tokens().issue("admin-123").unwrap();
        let other = SessionTokens::new(
            "different-secret-that-is-at-least-32-characters",
            DEFAULT_TOKEN_TTL,
        )
        .unwrap();

        assert_eq!(other.verify(&issued.token), Err(TokenRejection::BadSignature));
    }

    #[test]
    fn test_malformed_token() {
        let tokens = test_tokens();
        assert_eq!(tokens.verify("invalid-token"), Err(TokenRejection::Malformed));
        assert_eq!(tokens.verify(""), Err(TokenRejection::Malformed));
        assert_eq!(tokens.verify("a.b.c"), Err(TokenRejection::Malformed));
    }

    #[test]
    fn test_token_from_the_future_rejected() {
        let tokens = test_tokens();
        let issued = tokens
            .issue_at("admin-123", Duration::from_secs(60), 1_700_000_100)
            .unwrap();
        assert_eq!(
            tokens.verify_at(&issued.token, 1_700_000_000),
            Err(TokenRejection::Malformed)
        );
    }

    #[test]
    fn test_rejection_maps_to_unauthenticated() {
        let err: GatewayError = TokenRejection::Expired.into();
        assert!(matches!(err, GatewayError::Unauthenticated));
    }

    #[test]
    fn test_secret_validation() {
        assert!(SessionTokens::new("short", DEFAULT_TOKEN_TTL).is_err());
        assert!(SessionTokens::new("", DEFAULT_TOKEN_TTL).is_err());
        assert!(SessionTokens::new("this-secret-is-at-least-32-chars-long", DEFAULT_TOKEN_TTL).is_ok());
    }

    #[test]
    fn test_dev_mode_tokens() {
        let tokens = SessionTokens::new_dev();
        let issued = tokens.issue("admin-123").unwrap();
        assert!(tokens.verify(&issued.token).is_ok());

        let short = SessionTokens::new_dev().with_ttl(Duration::from_secs(60));
        let issued = short.issue("admin-123").unwrap();
        assert_eq!(issued.claims.exp - issued.claims.iat, 60);
    }
}
