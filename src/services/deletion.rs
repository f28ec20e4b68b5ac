//! Cross-store deletion cascades.
//!
//! Single-row deletes live on the owning services
//! ([`super::AttachmentService::delete`], [`super::MessageService::delete`]);
//! this service coordinates the operations that touch both stores.
//! Cross-store deletes are sequential, independently-committed
//! statements: when the text-store delete succeeds and the files-store
//! delete fails, the stores stay partially updated and the failure is
//! reported as-is. No compensation is attempted.

use tracing::info;

use crate::db::{self, DbPool};
use crate::{Error, Result};

#[derive(Clone)]
pub struct DeletionService {
    text_db: DbPool,
    files_db: DbPool,
}

impl DeletionService {
    pub fn new(text_db: DbPool, files_db: DbPool) -> Self {
        Self { text_db, files_db }
    }

    /// Delete the anchor message and everything at or after it.
    ///
    /// The anchor's `created_at` is the cutoff for BOTH stores, the
    /// attachment rows' own timestamps notwithstanding. Without a
    /// conversation id on the anchor the cutoff applies globally;
    /// with one, both deletes are scoped to that conversation.
    pub async fn delete_from_message(&self, id: i64) -> Result<()> {
        let anchor = db::get_message_anchor(&self.text_db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Message not found: {}", id)))?;

        let conversation = anchor.conversation_id.as_deref();

        let messages_deleted =
            db::delete_messages_since(&self.text_db, anchor.created_at, conversation).await?;
        let files_deleted =
            db::delete_files_since(&self.files_db, anchor.created_at, conversation).await?;

        info!(
            anchor = id,
            messages_deleted, files_deleted, "Deleted from message onward"
        );

        Ok(())
    }

    /// Delete every message and attachment in a conversation.
    ///
    /// A conversation id matching nothing deletes zero rows from each
    /// store; that is not an error.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(u64, u64)> {
        let messages_deleted =
            db::delete_conversation_messages(&self.text_db, conversation_id).await?;
        let files_deleted = db::delete_conversation_files(&self.files_db, conversation_id).await?;

        info!(
            conversation_id,
            messages_deleted, files_deleted, "Deleted conversation"
        );

        Ok((messages_deleted, files_deleted))
    }

    /// Administrative wipe of both stores.
    pub async fn delete_all(&self) -> Result<()> {
        let messages_deleted = db::delete_all_messages(&self.text_db).await?;
        let files_deleted = db::delete_all_files(&self.files_db).await?;

        info!(messages_deleted, files_deleted, "Deleted all rows from both stores");

        Ok(())
    }
}
