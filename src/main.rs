//! RSVP gateway binary

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rsvp_gateway::{
    auth::SessionTokens,
    config::Args,
    db::{AdminStore, GuestStore, MemoryStore, MongoClient, MongoStore},
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("rsvp_gateway={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  RSVP Gateway {}", env!("CARGO_PKG_VERSION"));
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {}/{}", args.mongodb_uri, args.mongodb_db);
    info!("Token lifetime: {}s", args.jwt_expiry_seconds);
    info!("Registration: {}", if args.allow_registration { "open" } else { "closed" });
    info!("======================================");

    let tokens = match args.jwt_secret.as_deref() {
        Some(secret) if !secret.is_empty() => match SessionTokens::new(secret, args.token_ttl()) {
            Ok(tokens) => tokens,
            Err(e) => {
                error!("Invalid JWT secret: {}", e);
                std::process::exit(1);
            }
        },
        _ => {
            warn!("No JWT_SECRET set, signing tokens with the development secret");
            SessionTokens::new_dev().with_ttl(args.token_ttl())
        }
    };
    let tokens = Arc::new(tokens);

    // MongoDB is required in production; dev mode falls back to memory
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => match MongoStore::new(&client).await {
            Ok(store) => {
                info!("MongoDB connected successfully");
                Some(Arc::new(store))
            }
            Err(e) => {
                error!("MongoDB index setup failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let admins: Arc<dyn AdminStore>;
    let guests: Arc<dyn GuestStore>;
    let store_kind = match mongo {
        Some(store) => {
            admins = store.clone();
            guests = store;
            "mongodb"
        }
        None => {
            let store = Arc::new(MemoryStore::new());
            admins = store.clone();
            guests = store;
            "memory"
        }
    };

    let state = Arc::new(server::AppState::new(args, tokens, admins, guests, store_kind));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
