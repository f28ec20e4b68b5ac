//! Age-based retention cleanup.
//!
//! Messages older than 90 days and attachments older than 30 days are
//! removed from their respective stores. The two deletions are
//! independent; a message can outlive its attachment by up to 60 days
//! and is then left with a dangling attachment reference. No
//! orphan-reference repair is attempted.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};

use crate::db::{self, DbPool};
use crate::Result;

/// Message rows older than this many days are removed.
pub const MESSAGE_RETENTION_DAYS: u32 = 90;

/// Attachment rows older than this many days are removed.
pub const FILE_RETENTION_DAYS: u32 = 30;

/// Per-store deleted counts from one cleanup pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupReport {
    pub messages_deleted: u64,
    pub files_deleted: u64,
}

#[derive(Clone)]
pub struct RetentionService {
    text_db: DbPool,
    files_db: DbPool,
}

impl RetentionService {
    pub fn new(text_db: DbPool, files_db: DbPool) -> Self {
        Self { text_db, files_db }
    }

    /// Run one cleanup pass against both stores.
    ///
    /// Idempotent: a pass with no eligible rows deletes nothing and
    /// still succeeds.
    pub async fn run_cleanup(&self) -> Result<CleanupReport> {
        let messages_deleted =
            db::delete_messages_older_than(&self.text_db, MESSAGE_RETENTION_DAYS).await?;
        let files_deleted =
            db::delete_files_older_than(&self.files_db, FILE_RETENTION_DAYS).await?;

        info!(messages_deleted, files_deleted, "Retention cleanup pass complete");

        Ok(CleanupReport {
            messages_deleted,
            files_deleted,
        })
    }

    /// Start the periodic cleanup loop.
    ///
    /// Returns `None` when `interval_secs` is 0; the deployment is then
    /// expected to trigger POST /api/cleanup from an external scheduler.
    pub fn start(&self, interval_secs: u64) -> Option<JoinHandle<()>> {
        if interval_secs == 0 {
            return None;
        }

        let service = self.clone();
        info!(interval_secs, "Starting retention cleanup loop");

        Some(tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(interval_secs));
            // The first tick fires immediately; skip it so startup
            // isn't serialized behind a cleanup pass.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = service.run_cleanup().await {
                    error!("Retention cleanup pass failed: {}", e);
                }
            }
        }))
    }
}
