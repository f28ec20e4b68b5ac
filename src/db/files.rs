//! Attachment queries against the files store.
//!
//! Attachment payloads live inline in the `files` table as LONGBLOBs;
//! rows are created once and never updated.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::Result;

/// Input for inserting an attachment.
#[derive(Debug, Clone)]
pub struct CreateFile {
    pub filename: String,
    pub mime_type: String,
    pub file_data: Vec<u8>,
    pub conversation_id: Option<String>,
}

/// Attachment content as read back for serving.
#[derive(Debug, Clone, FromRow)]
pub struct FileContent {
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub file_data: Option<Vec<u8>>,
}

/// Insert an attachment and return its store-assigned id.
pub async fn insert_file(pool: &DbPool, input: CreateFile) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO files (filename, mime_type, file_data, conversation_id) VALUES (?, ?, ?, ?)",
    )
    .bind(&input.filename)
    .bind(&input.mime_type)
    .bind(&input.file_data)
    .bind(&input.conversation_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_id() as i64)
}

/// Fetch an attachment's content by id.
pub async fn get_file(pool: &DbPool, id: i64) -> Result<Option<FileContent>> {
    let file = sqlx::query_as::<_, FileContent>(
        "SELECT filename, mime_type, file_data FROM files WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(file)
}

/// Delete one attachment. Returns the affected-row count.
pub async fn delete_file(pool: &DbPool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM files WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Delete attachments with `created_at >= cutoff`, optionally
/// conversation-scoped. The cutoff comes from the anchor *message's*
/// timestamp, not from any files-store row.
pub async fn delete_files_since(
    pool: &DbPool,
    cutoff: DateTime<Utc>,
    conversation_id: Option<&str>,
) -> Result<u64> {
    let result = match conversation_id {
        Some(conv) => {
            sqlx::query("DELETE FROM files WHERE conversation_id = ? AND created_at >= ?")
                .bind(conv)
                .bind(cutoff)
                .execute(pool)
                .await?
        }
        None => {
            sqlx::query("DELETE FROM files WHERE created_at >= ?")
                .bind(cutoff)
                .execute(pool)
                .await?
        }
    };

    Ok(result.rows_affected())
}

/// Delete every attachment in a conversation. Returns the affected-row count.
pub async fn delete_conversation_files(pool: &DbPool, conversation_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM files WHERE conversation_id = ?")
        .bind(conversation_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Empty the files table. Returns the affected-row count.
pub async fn delete_all_files(pool: &DbPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM files").execute(pool).await?;

    Ok(result.rows_affected())
}

/// Delete attachments older than the given age in days.
pub async fn delete_files_older_than(pool: &DbPool, days: u32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM files WHERE created_at < NOW() - INTERVAL ? DAY")
        .bind(days)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
