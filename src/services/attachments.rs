//! Attachment service.
//!
//! Uploads persist the payload in the files store and mirror a
//! companion message row into the text store so the attachment shows
//! up in conversation history. The two writes are sequential and
//! independently committed; when the second write fails the files row
//! stays behind and the failure is reported to the caller.

use tracing::warn;

use crate::db::{self, CreateFile, CreateMessage, DbPool, FileContent};
use crate::{Error, Result};

/// Maximum accepted attachment payload size (50 MiB).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// A successfully stored attachment.
#[derive(Debug, Clone)]
pub struct UploadedAttachment {
    pub id: i64,
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    pub conversation_id: Option<String>,
}

#[derive(Clone)]
pub struct AttachmentService {
    files_db: DbPool,
    text_db: DbPool,
    public_url: String,
}

impl AttachmentService {
    pub fn new(files_db: DbPool, text_db: DbPool, public_url: String) -> Self {
        Self {
            files_db,
            text_db,
            public_url,
        }
    }

    /// Retrieval URL for an attachment id.
    pub fn file_url(&self, id: i64) -> String {
        format!("{}/api/files/{}", self.public_url.trim_end_matches('/'), id)
    }

    /// Store an attachment and its companion message row.
    pub async fn upload(
        &self,
        data: Vec<u8>,
        filename: String,
        mime_type: String,
        conversation_id: Option<String>,
    ) -> Result<UploadedAttachment> {
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(Error::PayloadTooLarge {
                max: MAX_UPLOAD_BYTES,
            });
        }

        let file_id = db::insert_file(
            &self.files_db,
            CreateFile {
                filename: filename.clone(),
                mime_type: mime_type.clone(),
                file_data: data,
                conversation_id: conversation_id.clone(),
            },
        )
        .await?;

        let url = self.file_url(file_id);

        // Mirror the attachment into conversation history. No rollback
        // of the files row on failure; the stores are not coupled by a
        // transaction.
        let message = CreateMessage {
            role: "user".into(),
            content: String::new(),
            attachment_id: Some(file_id),
            attachment_url: Some(url.clone()),
            attachment_name: Some(filename.clone()),
            attachment_type: Some(mime_type.clone()),
            conversation_id: conversation_id.clone(),
            ..Default::default()
        };

        if let Err(e) = db::insert_message(&self.text_db, message).await {
            warn!(file_id, "Companion message insert failed; files row left behind: {}", e);
            return Err(e);
        }

        Ok(UploadedAttachment {
            id: file_id,
            url,
            filename,
            mime_type,
            conversation_id,
        })
    }

    /// Fetch an attachment's stored bytes and metadata.
    pub async fn retrieve(&self, id: i64) -> Result<FileContent> {
        db::get_file(&self.files_db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", id)))
    }

    /// Delete one attachment. Does not cascade to messages referencing it.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let affected = db::delete_file(&self.files_db, id).await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("File not found: {}", id)));
        }
        Ok(())
    }
}
