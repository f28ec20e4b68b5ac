//! Conversation deletion routes.
//!
//! Routes:
//! - DELETE /api/conversations/:id - Delete one conversation from both stores
//! - DELETE /api/conversations - Administrative delete-all

use axum::{
    extract::{Path, State},
    routing::delete,
    Json, Router,
};
use serde::Serialize;

use crate::{AppState, Result};

/// Build conversation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", delete(delete_all))
        .route("/:conversation_id", delete(delete_conversation))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Conversation delete response with per-store counts.
#[derive(Debug, Serialize)]
pub struct DeleteConversationResponse {
    pub ok: bool,
    pub messages_deleted: u64,
    pub files_deleted: u64,
}

/// Delete-all response.
#[derive(Debug, Serialize)]
pub struct DeleteAllResponse {
    pub ok: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Delete every message and attachment in a conversation.
///
/// DELETE /api/conversations/:conversation_id
///
/// A conversation id matching nothing deletes zero rows from each
/// store; that is not an error.
#[axum::debug_handler]
async fn delete_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<DeleteConversationResponse>> {
    let (messages_deleted, files_deleted) =
        state.deletion.delete_conversation(&conversation_id).await?;

    Ok(Json(DeleteConversationResponse {
        ok: true,
        messages_deleted,
        files_deleted,
    }))
}

/// Administrative wipe of both stores.
///
/// DELETE /api/conversations
#[axum::debug_handler]
async fn delete_all(State(state): State<AppState>) -> Result<Json<DeleteAllResponse>> {
    state.deletion.delete_all().await?;

    Ok(Json(DeleteAllResponse { ok: true }))
}
