//! Database layer for Palaver.
//!
//! Two independent MySQL-protocol stores back this service: the text
//! store owns the `messages` table, the files store owns the `files`
//! table. There are no cross-store foreign keys; each pool is built
//! and schema-initialized on its own.

mod files;
mod messages;

pub use files::*;
pub use messages::*;

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlSslMode};
use tracing::info;

use crate::config::StoreConfig;
use crate::{Error, Result};

/// Type alias for a store's connection pool.
pub type DbPool = sqlx::MySqlPool;

/// Timeout for acquiring a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Initialize a connection pool for one store.
///
/// The pool is bounded by the configured connection cap; acquiring a
/// connection waits at most [`ACQUIRE_TIMEOUT`] before failing with a
/// connection error. When CA material is configured the connection
/// requires TLS with server certificate verification.
pub async fn init_pool(cfg: &StoreConfig) -> Result<DbPool> {
    let mut options = MySqlConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .password(&cfg.password)
        .database(&cfg.database);

    if let Some(ca_b64) = &cfg.ca_b64 {
        let pem = decode_ca(ca_b64)?;
        options = options
            .ssl_mode(MySqlSslMode::VerifyCa)
            .ssl_ca_from_pem(pem);
    }

    let pool = MySqlPoolOptions::new()
        .max_connections(cfg.max_connections)
        .min_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;

    info!("Store pool initialized: {}:{}/{}", cfg.host, cfg.port, cfg.database);

    Ok(pool)
}

/// Decode a base64-encoded PEM CA certificate from the environment.
fn decode_ca(ca_b64: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(ca_b64.trim())
        .map_err(|e| Error::Internal(format!("Invalid CA certificate material: {}", e)))
}

/// Initialize the text store schema (messages table).
pub async fn initialize_text_schema(pool: &DbPool) -> Result<()> {
    apply_schema(pool, include_str!("../../schema/messages.sql")).await?;
    info!("Text store schema initialized");
    Ok(())
}

/// Initialize the files store schema (files table).
pub async fn initialize_files_schema(pool: &DbPool) -> Result<()> {
    apply_schema(pool, include_str!("../../schema/files.sql")).await?;
    info!("Files store schema initialized");
    Ok(())
}

/// Apply a schema file. Uses IF NOT EXISTS clauses so it's safe to run
/// multiple times.
async fn apply_schema(pool: &DbPool, schema: &str) -> Result<()> {
    // Execute statement by statement; the files may contain comments
    for statement in schema.split(';') {
        let clean_stmt: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let clean_stmt = clean_stmt.trim();
        if clean_stmt.is_empty() {
            continue;
        }
        sqlx::query(clean_stmt).execute(pool).await?;
    }

    Ok(())
}

/// Health check for a store connection.
pub async fn health_check(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
