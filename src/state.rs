//! Application state for Palaver.
//!
//! Contains the shared state that is passed to all handlers: the two
//! store pools, created once at startup, and the services built over
//! them. No global mutable pools; everything is injected.

use crate::config;
use crate::db::{self, DbPool};
use crate::services::{AttachmentService, DeletionService, MessageService, RetentionService};
use crate::Result;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Text store pool (messages).
    pub text_db: DbPool,
    /// Files store pool (attachments).
    pub files_db: DbPool,
    /// Attachment upload/retrieval service.
    pub attachments: AttachmentService,
    /// Message persistence service.
    pub messages: MessageService,
    /// Age-based cleanup service.
    pub retention: RetentionService,
    /// Cross-store deletion service.
    pub deletion: DeletionService,
}

impl AppState {
    /// Create a new application state: connect both pools, apply the
    /// idempotent schemas, and wire up the services.
    pub async fn new() -> Result<Self> {
        let config = config::config();

        let text_db = db::init_pool(&config.text_store).await?;
        let files_db = db::init_pool(&config.files_store).await?;

        db::initialize_text_schema(&text_db).await?;
        db::initialize_files_schema(&files_db).await?;

        Ok(Self::from_pools(
            text_db,
            files_db,
            config.server.public_url.clone(),
        ))
    }

    /// Build state from pre-made pools. Used directly by tests.
    pub fn from_pools(text_db: DbPool, files_db: DbPool, public_url: String) -> Self {
        let attachments = AttachmentService::new(files_db.clone(), text_db.clone(), public_url);
        let messages = MessageService::new(text_db.clone());
        let retention = RetentionService::new(text_db.clone(), files_db.clone());
        let deletion = DeletionService::new(text_db.clone(), files_db.clone());

        Self {
            text_db,
            files_db,
            attachments,
            messages,
            retention,
            deletion,
        }
    }
}
