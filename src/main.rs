// Tipstream Backend Server
// REST API for creator tipping: profiles, shareable links, on-chain payment
// ingestion, and analytics.

mod analytics;
mod auth;
mod error;
mod handlers;
mod models;
mod slug;
mod store;
mod sui;

use anyhow::{Context, Result};
use auth::TokenSigner;
use axum::{
    routing::{get, post},
    Router,
};
use rand::RngCore;
use std::sync::Arc;
use store::{FileStore, MemoryStore, PostgresStore, Store};
use sui::{ChainInspector, NameService, SuiClient};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const DEFAULT_SUI_RPC_URL: &str = "https://fullnode.testnet.sui.io:443";

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub chain: Arc<dyn ChainInspector>,
    pub names: Arc<dyn NameService>,
    pub auth: Arc<TokenSigner>,
    /// When set, payment recording polls until the node confirms the digest.
    pub wait_for_confirmation: bool,
}

async fn build_store(backend: &str) -> Result<Arc<dyn Store>> {
    match backend {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "file" => {
            let dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
            info!("Using file storage in {}", dir);
            Ok(Arc::new(FileStore::new(dir)))
        }
        "postgres" => {
            let database_url = std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set for the postgres backend")?;
            Ok(Arc::new(PostgresStore::connect(&database_url).await?))
        }
        other => anyhow::bail!("Unknown STORAGE_BACKEND: {other}"),
    }
}

fn auth_secret() -> Vec<u8> {
    match std::env::var("AUTH_SECRET") {
        Ok(secret) if !secret.is_empty() => secret.into_bytes(),
        _ => {
            // Tokens from previous runs die with the process in this mode.
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            warn!(
                "AUTH_SECRET not set; using an ephemeral secret {}...",
                &hex::encode(bytes)[..8]
            );
            bytes.to_vec()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tipstream_backend=info".parse().unwrap())
                .add_directive("sqlx=warn".parse().unwrap()),
        )
        .init();

    info!("Starting Tipstream Backend Server");

    // Load configuration
    let storage_backend =
        std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "memory".to_string());
    let sui_rpc_url =
        std::env::var("SUI_RPC_URL").unwrap_or_else(|_| DEFAULT_SUI_RPC_URL.to_string());
    let wait_for_confirmation = std::env::var("TIP_WAIT_FOR_TX")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let server_port = std::env::var("PORT")
        .unwrap_or_else(|_| "4000".to_string())
        .parse::<u16>()?;

    info!("Configuration:");
    info!("  Storage backend: {}", storage_backend);
    info!("  Sui RPC: {}", sui_rpc_url);
    info!("  Wait for tx confirmation: {}", wait_for_confirmation);
    info!("  Server Port: {}", server_port);

    let store = build_store(&storage_backend).await?;
    let sui_client = Arc::new(SuiClient::new(sui_rpc_url));

    // Create app state
    let state = Arc::new(AppState {
        store,
        chain: sui_client.clone(),
        names: sui_client,
        auth: Arc::new(TokenSigner::new(auth_secret())),
        wait_for_confirmation,
    });

    // Setup CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        // Auth
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Authenticated creator endpoints
        .route(
            "/api/creator/profile",
            get(handlers::profile::get_profile).put(handlers::profile::update_profile),
        )
        .route(
            "/api/creator/links",
            get(handlers::links::list_links).post(handlers::links::create_link),
        )
        .route(
            "/api/creator/links/:link_id",
            axum::routing::put(handlers::links::update_link)
                .delete(handlers::links::delete_link),
        )
        .route("/api/creator/payments", get(handlers::payments::list_payments))
        .route(
            "/api/creator/analytics",
            get(handlers::analytics::get_analytics),
        )
        // Payment ingestion
        .route("/api/payments/record", post(handlers::payments::record_payment))
        // Public pages
        .route(
            "/api/public/creator/:username",
            get(handlers::public::get_public_creator),
        )
        .route("/api/public/link/:slug", get(handlers::public::get_public_link))
        // SuiNS
        .route(
            "/api/suins/validate",
            get(handlers::suins::lookup).post(handlers::suins::validate),
        )
        .with_state(state)
        .layer(cors);

    // Start server
    let addr = format!("0.0.0.0:{}", server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Tipstream Backend listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
