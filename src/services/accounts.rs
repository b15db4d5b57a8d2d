//! Administrator registration and login

use bson::DateTime;
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

use crate::auth::{hash_password, verify_password, IssuedToken, SessionTokens};
use crate::db::schemas::{AdminDoc, Language};
use crate::db::AdminStore;
use crate::types::GatewayError;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct Session {
    pub token: IssuedToken,
    pub admin: AdminDoc,
}

/// Registration input
#[derive(Debug, Clone)]
pub struct Registration {
    pub identity: String,
    pub password: String,
    pub name: String,
    pub language: Language,
}

/// Administrator account operations
#[derive(Clone)]
pub struct AccountService {
    admins: Arc<dyn AdminStore>,
    tokens: Arc<SessionTokens>,
}

impl AccountService {
    pub fn new(admins: Arc<dyn AdminStore>, tokens: Arc<SessionTokens>) -> Self {
        Self { admins, tokens }
    }

    /// Create an administrator
    ///
    /// There is no existence pre-check: the identity index rejects the
    /// insert and that rejection becomes `DuplicateIdentity`.
    pub async fn register(&self, registration: Registration) -> Result<AdminDoc, GatewayError> {
        let identity = registration.identity.trim();
        if !looks_like_email(identity) {
            return Err(GatewayError::BadRequest("A valid email is required".into()));
        }
        if registration.name.trim().is_empty() {
            return Err(GatewayError::BadRequest("Name is required".into()));
        }

        let password_hash = hash_password(&registration.password)?;
        let admin = AdminDoc::new(
            identity.to_string(),
            password_hash,
            registration.name.trim().to_string(),
            registration.language,
        );

        match self.admins.insert(admin.clone()).await {
            Ok(()) => {
                info!("Registered administrator {}", admin.identity);
                Ok(admin)
            }
            Err(GatewayError::UniqueConstraintViolation { field: "identity" }) => {
                Err(GatewayError::DuplicateIdentity)
            }
            Err(e) => Err(e),
        }
    }

    /// Check credentials and issue a session token
    ///
    /// Unknown identity and wrong password give the same error, and both
    /// paths run one Argon2 verification.
    pub async fn login(&self, identity: &str, password: &str) -> Result<Session, GatewayError> {
        let identity = identity.trim();

        let Some(mut admin) = self.admins.find_by_identity(identity).await? else {
            // Same Argon2 cost as a real check
            if let Err(e) = verify_password(password, dummy_hash()) {
                error!("Timing equalisation hash is unusable: {}", e);
            }
            warn!("Login failed for {}", identity);
            return Err(GatewayError::InvalidCredentials);
        };

        if !verify_password(password, &admin.password_hash)? {
            warn!("Login failed for {}", identity);
            return Err(GatewayError::InvalidCredentials);
        }

        let token = self.tokens.issue(&admin.id)?;

        admin.last_login_at = Some(DateTime::now());
        if let Err(e) = self.admins.update(&admin).await {
            warn!("Failed to record login time for {}: {}", admin.identity, e);
        }

        info!("Login successful: {}", admin.identity);
        Ok(Session { token, admin })
    }
}

fn looks_like_email(identity: &str) -> bool {
    match identity.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !identity.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Well-formed Argon2id hash with the default cost parameters. Nothing
/// verifies against it.
const FALLBACK_DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$cnN2cC1nYXRld2F5LXBhZA$AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8";

fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        hash_password("timing-equaliser-for-unknown-identities").unwrap_or_else(|e| {
            warn!("Could not hash the timing equalisation password, using fallback: {}", e);
            FALLBACK_DUMMY_HASH.to_string()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DEFAULT_TOKEN_TTL;
    use crate::db::MemoryStore;

    fn service() -> (AccountService, Arc<SessionTokens>) {
        let tokens = Arc::new(
            SessionTokens::new("accounts-test-secret-at-least-32-chars", DEFAULT_TOKEN_TTL)
                .unwrap(),
        );
        let store = Arc::new(MemoryStore::new());
        (AccountService::new(store, Arc::clone(&tokens)), tokens)
    }

    fn registration(identity: &str, password: &str) -> Registration {
        Registration {
            identity: identity.into(),
            password: password.into(),
            name: "Admin".into(),
            language: Language::En,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (accounts, tokens) = service();

        let admin = accounts
            .register(registration("admin@example.com", "hunter2"))
            .await
            .unwrap();
        assert_ne!(admin.password_hash, "hunter2");
        assert!(!admin.password_hash.contains("hunter2"));

        let session = accounts.login("admin@example.com", "hunter2").await.unwrap();
        assert_eq!(session.admin.id, admin.id);
        assert!(session.admin.last_login_at.is_some());

        let claims = tokens.verify(&session.token.token).unwrap();
        assert_eq!(claims.sub, admin.id);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let (accounts, _) = service();
        accounts
            .register(registration("admin@example.com", "hunter2"))
            .await
            .unwrap();

        let err = accounts.login("admin@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unknown_identity_looks_like_wrong_password() {
        let (accounts, _) = service();
        let err = accounts.login("nobody@example.com", "hunter2").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_duplicate_identity() {
        let (accounts, _) = service();
        accounts
            .register(registration("admin@example.com", "hunter2"))
            .await
            .unwrap();

        let err = accounts
            .register(registration("admin@example.com", "other-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::DuplicateIdentity));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (accounts, _) = service();

        let err = accounts.register(registration("not-an-email", "pw")).await.unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest(_)));

        let err = accounts
            .register(registration("admin@example.com", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest(_)));
    }

    #[test]
    fn test_dummy_hashes_run_a_real_verification() {
        use argon2::password_hash::PasswordHash;

        for hash in [dummy_hash(), FALLBACK_DUMMY_HASH] {
            let parsed = PasswordHash::new(hash).unwrap();
            assert_eq!(parsed.algorithm.as_str(), "argon2id");
            assert!(!verify_password("hunter2", hash).unwrap());
        }
    }
}
