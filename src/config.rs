//! Configuration for the RSVP gateway
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::jwt::MIN_SECRET_LEN;

/// RSVP gateway - guest access codes and administrator sessions
#[derive(Parser, Debug, Clone)]
#[command(name = "rsvp-gateway")]
#[command(about = "RSVP API with guest access codes and administrator sessions")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Enable development mode (fixed JWT secret, in-memory store fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "rsvp")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (default 7 days)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "604800")]
    pub jwt_expiry_seconds: u64,

    /// Insert attempts when allocating a guest access code
    #[arg(long, env = "ACCESS_CODE_ATTEMPTS", default_value = "5")]
    pub access_code_attempts: u32,

    /// Whether POST /api/auth/register is open
    #[arg(long, env = "ALLOW_REGISTRATION", default_value = "true", action = clap::ArgAction::Set)]
    pub allow_registration: bool,

    /// Value of Access-Control-Allow-Origin
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Token lifetime
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt_expiry_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match self.jwt_secret.as_deref() {
                None | Some("") => {
                    return Err("JWT_SECRET is required in production mode".to_string());
                }
                Some(secret) if secret.len() < MIN_SECRET_LEN => {
                    return Err(format!(
                        "JWT_SECRET must be at least {} characters",
                        MIN_SECRET_LEN
                    ));
                }
                Some(_) => {}
            }
        }

        if self.access_code_attempts == 0 {
            return Err("ACCESS_CODE_ATTEMPTS must be at least 1".to_string());
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than 0".to_string());
        }

        Ok(())
    }
}
