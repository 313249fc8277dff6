//! HTTP surface for DocDrive.
//!
//! Thin axum layer over [`docdrive_storage::DriveClient`]: each route maps
//! to one client operation and serializes the result as JSON.

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::Settings;
pub use state::AppState;

/// Route that starts the browser consent flow.
pub const LOGIN_PATH: &str = "/auth/login";

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/drive/files", get(handlers::list_files))
        .route("/drive/search", get(handlers::search_files))
        .route("/drive/files/{file_id}/metadata", get(handlers::file_metadata))
        .route("/drive/files/type/{doc_type}", get(handlers::files_by_type))
        .route(LOGIN_PATH, get(auth::login))
        .route("/oauth2-redirect", get(auth::oauth2_redirect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "ok" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build state from `settings` and serve until Ctrl-C.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let state = AppState::from_settings(&settings).context("Failed to initialize Google Drive access")?;
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(settings.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind))?;
    info!("Listening on {}", settings.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
