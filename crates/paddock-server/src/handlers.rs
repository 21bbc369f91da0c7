//! HTTP request handlers. Everything is answered from the poller's cache;
//! only the refresh command waits on the provider.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json},
};

use paddock_core::models::DashboardPayload;
use paddock_core::poller::PollStatus;
use paddock_core::spoiler::RevealState;
use paddock_core::{Poller, RefreshOutcome, Trigger};

use crate::view;

const DASHBOARD_JS: &str = include_str!("../assets/dashboard.js");
const DASHBOARD_CSS: &str = include_str!("../assets/dashboard.css");

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct AppState {
    poller: Arc<Poller>,
}

impl AppState {
    pub fn new(poller: Arc<Poller>) -> Self {
        Self { poller }
    }
}

/// The dashboard page. Standings are blurred unless the reveal cookie
/// matches the current fingerprint.
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let payload = state.poller.payload().await;
    let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    let reveal = RevealState::from_cookie_header(cookie);
    Html(view::render_page(&payload, &reveal))
}

pub async fn data(State(state): State<AppState>) -> Json<DashboardPayload> {
    Json(state.poller.payload().await)
}

pub async fn status(State(state): State<AppState>) -> Json<PollStatus> {
    Json(state.poller.status().await)
}

pub async fn refresh(State(state): State<AppState>) -> (StatusCode, Json<RefreshOutcome>) {
    let outcome = state.poller.refresh(Trigger::Manual).await;
    let code = match outcome {
        RefreshOutcome::Completed { .. } => StatusCode::OK,
        RefreshOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
        RefreshOutcome::AlreadyRunning => StatusCode::CONFLICT,
        RefreshOutcome::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(outcome))
}

pub async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        DASHBOARD_JS,
    )
}

pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], DASHBOARD_CSS)
}

// ============================================================================
// Tests
// ============================================================================
