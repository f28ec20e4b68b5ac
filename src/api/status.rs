//! Operational routes.
//!
//! Routes:
//! - GET /health - Basic health check
//! - POST /api/cleanup - On-demand retention pass

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{AppState, Result};

/// Build operational routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/cleanup", post(run_cleanup))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Cleanup response with per-store deleted counts.
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub ok: bool,
    pub messages_deleted: u64,
    pub files_deleted: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Basic health check.
///
/// GET /health
///
/// Returns 200 if the server is running. Used by the hosting platform
/// for availability checking.
#[axum::debug_handler]
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Run one retention cleanup pass against both stores.
///
/// POST /api/cleanup
///
/// Idempotent; a pass with no eligible rows reports zero deletions.
#[axum::debug_handler]
async fn run_cleanup(State(state): State<AppState>) -> Result<Json<CleanupResponse>> {
    let report = state.retention.run_cleanup().await?;

    Ok(Json(CleanupResponse {
        ok: true,
        messages_deleted: report.messages_deleted,
        files_deleted: report.files_deleted,
    }))
}
