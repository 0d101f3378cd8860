//! FaithConnect Backup Backend
//!
//! Snapshot export, consistency validation and non-destructive restore for
//! the FaithConnect membership records platform, backed by SQLite.

mod api;
mod auth;
mod backup;
mod config;
mod db;
mod errors;
mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, MIN_BACKUP_KEY_LEN};
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FaithConnect Backup Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Snapshot directory: {:?}", config.snapshot_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (FC_API_PSK). Authentication is disabled!");
    }

    // Warn if a backup key is configured but unusable
    if config.backup_key.is_some() && config.cipher_key().is_none() {
        tracing::warn!(
            "FC_BACKUP_KEY is shorter than {} bytes and will be ignored; snapshots are written as plaintext",
            MIN_BACKUP_KEY_LEN
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config),
    };

    // Start the scheduled backup loop, if configured
    backup::scheduler::spawn_backup_scheduler(state.clone());

    // Build router
    let app = create_router(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    tracing::info!("Server listening on {}", state.config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        .route(
            "/backup/export",
            get(api::export_snapshot).post(api::persist_snapshot),
        )
        .route("/backup/snapshots", get(api::list_snapshots))
        .route("/backup/restore", post(api::restore_snapshot))
        .route("/backup/restore/member", post(api::restore_member))
        .route("/backup/consistency", get(api::consistency_check))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
