// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. The service is a single-user,
// read-only monitor, so there is no authentication anywhere.
//
// CORS is configured permissively so the static dashboard can be hosted
// from any origin.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app_state::AppState;
use crate::funding::{run_refresh_cycle, RefreshStatus};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/top", get(top))
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/refresh", post(trigger_refresh))
        // ── WebSocket (handled in the ws module but mounted here) ────
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Funding board
// =============================================================================

/// The ranked entries only — what the dashboard cards render.
async fn top(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let entries = state.board.read().entries.clone();
    Json(entries)
}

/// Full snapshot: board, busy flag, diagnostics, config summary.
async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.build_snapshot();
    Json(snapshot)
}

// =============================================================================
// Manual refresh
// =============================================================================

/// Manual refresh trigger — same code path as the timer. Returns 409 when a
/// cycle is already in flight so the dashboard can keep its spinner going.
async fn trigger_refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("manual refresh requested via API");

    match run_refresh_cycle(&state).await {
        RefreshStatus::Completed => {
            let board = state.board.read().clone();
            (StatusCode::OK, Json(board)).into_response()
        }
        RefreshStatus::AlreadyRunning => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "a refresh cycle is already in flight" })),
        )
            .into_response(),
    }
}
