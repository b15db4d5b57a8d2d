//! Authentication for the RSVP gateway
//!
//! Provides:
//! - Password hashing with Argon2
//! - Guest access code generation
//! - JWT session token issuance and verification
//! - The bearer-token access guard for administrator routes

pub mod access_code;
pub mod guard;
pub mod jwt;
pub mod password;

pub use access_code::{generate_access_code, is_valid_access_code, normalize_access_code};
pub use guard::{extract_bearer_token, AccessGuard, AuthenticatedAdmin, BEARER_CHALLENGE};
pub use jwt::{Claims, IssuedToken, SessionTokens, TokenRejection, DEFAULT_TOKEN_TTL};
pub use password::{hash_password, verify_password};
