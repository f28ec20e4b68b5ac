//! Message queries against the text store.
//!
//! Every statement here is fixed text with bound parameters; nothing
//! is interpolated. Deletes return the affected-row count and leave
//! not-found decisions to the service layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::DbPool;
use crate::Result;

/// Message row from the text store.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub role: Option<String>,
    pub content: Option<String>,
    pub parent_id: Option<i64>,
    pub attachment_id: Option<i64>,
    pub attachment_url: Option<String>,
    pub attachment_name: Option<String>,
    pub attachment_type: Option<String>,
    pub conversation_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a message.
#[derive(Debug, Clone, Default)]
pub struct CreateMessage {
    pub role: String,
    pub content: String,
    pub parent_id: Option<i64>,
    pub attachment_id: Option<i64>,
    pub attachment_url: Option<String>,
    pub attachment_name: Option<String>,
    pub attachment_type: Option<String>,
    pub conversation_id: Option<String>,
}

/// Timestamp and conversation of a message, used as a delete anchor.
#[derive(Debug, Clone, FromRow)]
pub struct MessageAnchor {
    pub created_at: DateTime<Utc>,
    pub conversation_id: Option<String>,
}

/// Insert a message and return its store-assigned id.
pub async fn insert_message(pool: &DbPool, input: CreateMessage) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO messages
            (role, content, parent_id, attachment_id, attachment_url, attachment_name, attachment_type, conversation_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.role)
    .bind(&input.content)
    .bind(input.parent_id)
    .bind(input.attachment_id)
    .bind(&input.attachment_url)
    .bind(&input.attachment_name)
    .bind(&input.attachment_type)
    .bind(&input.conversation_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_id() as i64)
}

/// List messages ordered oldest-first, optionally conversation-scoped.
pub async fn list_messages(
    pool: &DbPool,
    conversation_id: Option<&str>,
    limit: i64,
) -> Result<Vec<Message>> {
    let messages = match conversation_id {
        Some(conv) => {
            sqlx::query_as::<_, Message>(
                r#"
                SELECT id, role, content, parent_id, attachment_id, attachment_url,
                       attachment_name, attachment_type, conversation_id, created_at
                FROM messages
                WHERE conversation_id = ?
                ORDER BY created_at ASC
                LIMIT ?
                "#,
            )
            .bind(conv)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Message>(
                r#"
                SELECT id, role, content, parent_id, attachment_id, attachment_url,
                       attachment_name, attachment_type, conversation_id, created_at
                FROM messages
                ORDER BY created_at ASC
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(messages)
}

/// Look up a message's timestamp and conversation id.
pub async fn get_message_anchor(pool: &DbPool, id: i64) -> Result<Option<MessageAnchor>> {
    let anchor = sqlx::query_as::<_, MessageAnchor>(
        "SELECT created_at, conversation_id FROM messages WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(anchor)
}

/// Delete one message. Returns the affected-row count.
pub async fn delete_message(pool: &DbPool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM messages WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Delete messages with `created_at >= cutoff`, optionally
/// conversation-scoped. Returns the affected-row count.
pub async fn delete_messages_since(
    pool: &DbPool,
    cutoff: DateTime<Utc>,
    conversation_id: Option<&str>,
) -> Result<u64> {
    let result = match conversation_id {
        Some(conv) => {
            sqlx::query("DELETE FROM messages WHERE conversation_id = ? AND created_at >= ?")
                .bind(conv)
                .bind(cutoff)
                .execute(pool)
                .await?
        }
        None => {
            sqlx::query("DELETE FROM messages WHERE created_at >= ?")
                .bind(cutoff)
                .execute(pool)
                .await?
        }
    };

    Ok(result.rows_affected())
}

/// Delete every message in a conversation. Returns the affected-row count.
pub async fn delete_conversation_messages(pool: &DbPool, conversation_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
        .bind(conversation_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Empty the messages table. Returns the affected-row count.
pub async fn delete_all_messages(pool: &DbPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM messages").execute(pool).await?;

    Ok(result.rows_affected())
}

/// Delete messages older than the given age in days.
pub async fn delete_messages_older_than(pool: &DbPool, days: u32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM messages WHERE created_at < NOW() - INTERVAL ? DAY")
        .bind(days)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
