//! HTTP server setup

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{self, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/data", get(handlers::data))
        // Older page scripts used this path
        .route("/api/dashboard-data", get(handlers::data))
        .route("/api/status", get(handlers::status))
        .route("/api/refresh", post(handlers::refresh))
        .route("/static/dashboard.js", get(handlers::script))
        .route("/static/dashboard.css", get(handlers::stylesheet))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled. In-flight requests are allowed to finish.
pub async fn serve(addr: SocketAddr, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Dashboard listening on http://{}/", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")?;
    Ok(())
}
