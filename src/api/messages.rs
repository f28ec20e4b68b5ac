//! Message routes.
//!
//! Routes:
//! - POST /api/messages - Persist a message
//! - GET /api/messages - List messages (optional conversation scope)
//! - DELETE /api/messages/:id - Delete one message
//! - DELETE /api/messages/after/:id - Delete the message and everything
//!   at or after its timestamp, in both stores

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{CreateMessage, Message};
use crate::{AppState, Result};

/// Build message routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_messages).post(post_message))
        .route("/:id", delete(delete_message))
        .route("/after/:id", delete(delete_after_message))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Message creation request.
///
/// The attachment pointer fields are camelCased on the wire while the
/// rest is snake_cased; the mixed convention is the original client
/// contract and is kept as-is.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default, rename = "attachmentId")]
    pub attachment_id: Option<i64>,
    #[serde(default, rename = "attachmentUrl")]
    pub attachment_url: Option<String>,
    #[serde(default, rename = "attachmentName")]
    pub attachment_name: Option<String>,
    #[serde(default, rename = "attachmentType")]
    pub attachment_type: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Message creation response.
#[derive(Debug, Serialize)]
pub struct PostMessageResponse {
    pub id: i64,
    pub conversation_id: Option<String>,
}

/// Query parameters for listing messages.
#[derive(Debug, Deserialize, Default)]
pub struct ListMessagesQuery {
    pub conversation_id: Option<String>,
    pub limit: Option<u32>,
}

/// Delete response.
#[derive(Debug, Serialize)]
pub struct DeleteMessageResponse {
    pub ok: bool,
    pub deleted: i64,
}

/// From-message-onward delete response.
#[derive(Debug, Serialize)]
pub struct DeleteAfterResponse {
    pub ok: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Persist a message.
///
/// POST /api/messages
///
/// parent_id and the attachment pointer are stored unchecked; the data
/// model tolerates dangling references.
#[axum::debug_handler]
async fn post_message(
    State(state): State<AppState>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<PostMessageResponse>> {
    let conversation_id = req.conversation_id.clone();

    let id = state
        .messages
        .post(CreateMessage {
            role: req.role,
            content: req.content,
            parent_id: req.parent_id,
            attachment_id: req.attachment_id,
            attachment_url: req.attachment_url,
            attachment_name: req.attachment_name,
            attachment_type: req.attachment_type,
            conversation_id: req.conversation_id,
        })
        .await?;

    Ok(Json(PostMessageResponse {
        id,
        conversation_id,
    }))
}

/// List messages oldest-first.
///
/// GET /api/messages?conversation_id=...&limit=...
#[axum::debug_handler]
async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<Vec<Message>>> {
    let messages = state
        .messages
        .list(query.conversation_id.as_deref(), query.limit)
        .await?;

    Ok(Json(messages))
}

/// Delete one message.
///
/// DELETE /api/messages/:id
#[axum::debug_handler]
async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteMessageResponse>> {
    state.messages.delete(id).await?;

    Ok(Json(DeleteMessageResponse {
        ok: true,
        deleted: id,
    }))
}

/// Delete the anchor message and everything from its timestamp onward.
///
/// DELETE /api/messages/after/:id
#[axum::debug_handler]
async fn delete_after_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteAfterResponse>> {
    state.deletion.delete_from_message(id).await?;

    Ok(Json(DeleteAfterResponse { ok: true }))
}
