//! Message service.
//!
//! Thin validation and limit policy over the text store. References to
//! parents and attachments are intentionally unchecked; the data model
//! tolerates dangling ids.

use crate::db::{self, CreateMessage, DbPool, Message};
use crate::{Error, Result};

/// Maximum message content length, in characters.
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Rows returned by list when no limit is requested.
pub const DEFAULT_LIST_LIMIT: u32 = 200;

/// Hard cap on the list limit, whatever the caller asks for.
pub const MAX_LIST_LIMIT: u32 = 1000;

/// Clamp a requested list limit to the allowed range.
pub fn effective_limit(requested: Option<u32>) -> i64 {
    i64::from(requested.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT))
}

#[derive(Clone)]
pub struct MessageService {
    text_db: DbPool,
}

impl MessageService {
    pub fn new(text_db: DbPool) -> Self {
        Self { text_db }
    }

    /// Persist a message and return its store-assigned id.
    pub async fn post(&self, input: CreateMessage) -> Result<i64> {
        if input.content.chars().count() > MAX_CONTENT_CHARS {
            return Err(Error::PayloadTooLarge {
                max: MAX_CONTENT_CHARS,
            });
        }

        db::insert_message(&self.text_db, input).await
    }

    /// List messages oldest-first, optionally scoped to one conversation.
    ///
    /// Truncation keeps the *oldest* rows when the store holds more than
    /// `limit`; callers wanting recent history must raise the limit.
    pub async fn list(
        &self,
        conversation_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Message>> {
        db::list_messages(&self.text_db, conversation_id, effective_limit(limit)).await
    }

    /// Delete one message. Does not cascade to its attachment.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let affected = db::delete_message(&self.text_db, id).await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("Message not found: {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lazy pool that never reaches a real server; store calls fail
    /// fast instead of hanging.
    fn unreachable_pool() -> DbPool {
        sqlx::mysql::MySqlPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(1))
            .connect_lazy("mysql://root@127.0.0.1:1/test")
            .unwrap()
    }

    #[test]
    fn test_effective_limit_default() {
        assert_eq!(effective_limit(None), 200);
    }

    #[test]
    fn test_effective_limit_respects_request() {
        assert_eq!(effective_limit(Some(25)), 25);
        assert_eq!(effective_limit(Some(1000)), 1000);
    }

    #[test]
    fn test_effective_limit_caps_at_max() {
        assert_eq!(effective_limit(Some(5000)), 1000);
    }

    #[tokio::test]
    async fn test_post_rejects_long_content() {
        let svc = MessageService::new(unreachable_pool());

        let input = CreateMessage {
            role: "user".into(),
            content: "x".repeat(MAX_CONTENT_CHARS + 1),
            ..Default::default()
        };
        let err = svc.post(input).await.unwrap_err();
        assert_eq!(err.error_code(), "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_post_counts_characters_not_bytes() {
        let svc = MessageService::new(unreachable_pool());

        // 10,000 multibyte characters are exactly at the limit; the
        // length check passes and the call proceeds to the (lazy,
        // unreachable) store, so the failure is a store error rather
        // than a payload rejection.
        let input = CreateMessage {
            role: "user".into(),
            content: "é".repeat(MAX_CONTENT_CHARS),
            ..Default::default()
        };
        let err = svc.post(input).await.unwrap_err();
        assert_ne!(err.error_code(), "PAYLOAD_TOO_LARGE");
    }
}
