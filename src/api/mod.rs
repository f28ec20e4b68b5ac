//! API routes for Palaver.
//!
//! This module combines all API routes into a single router.
//!
//! Route structure:
//! - /api/files/* - Attachment upload, retrieval, deletion
//! - /api/messages/* - Message CRUD and from-message-onward deletion
//! - /api/conversations/* - Conversation-scoped and administrative deletion
//! - /api/cleanup - On-demand retention pass
//! - /health - Health check

mod conversations;
mod files;
mod messages;
pub mod status;

use axum::Router;

use crate::AppState;

/// Build the complete API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(status::routes())
        .nest("/api/files", files::routes())
        .nest("/api/messages", messages::routes())
        .nest("/api/conversations", conversations::routes())
}
