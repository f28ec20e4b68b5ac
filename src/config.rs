//! Configuration management for Palaver.
//!
//! Loads configuration from environment variables. The two relational
//! stores (text messages and file attachments) are configured
//! independently via TEXT_DB_* and FILES_DB_* variables, matching the
//! two-cluster deployment this service fronts.

use std::env;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Initialize configuration (call once at startup)
pub fn init() -> &'static Config {
    config()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub text_store: StoreConfig,
    pub files_store: StoreConfig,
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL used to build attachment retrieval URLs.
    pub public_url: String,
}

/// Connection settings for one relational store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Base64-encoded PEM CA certificate for TLS, as handed out by the
    /// hosted cluster. Empty means plain connections.
    pub ca_b64: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Interval for the in-process cleanup trigger, in seconds.
    /// 0 disables the background task (an external scheduler can still
    /// hit POST /api/cleanup).
    pub interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_or("PORT", "3000").parse().expect("Invalid PORT"),
                public_url: env_or("PUBLIC_URL", "http://localhost:3000"),
            },
            text_store: StoreConfig::from_env_prefix("TEXT_DB"),
            files_store: StoreConfig::from_env_prefix("FILES_DB"),
            cleanup: CleanupConfig {
                interval_secs: env_or("CLEANUP_INTERVAL_SECS", "0").parse().unwrap_or(0),
            },
        }
    }
}

impl StoreConfig {
    /// Read one store's settings from `{PREFIX}_HOST`, `{PREFIX}_PORT`, etc.
    fn from_env_prefix(prefix: &str) -> Self {
        let var = |suffix: &str| env::var(format!("{}_{}", prefix, suffix));

        Self {
            host: var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4000),
            user: var("USER").unwrap_or_else(|_| "root".into()),
            password: var("PASS").unwrap_or_default(),
            database: var("NAME").unwrap_or_else(|_| "test".into()),
            ca_b64: var("CA_B64").ok().filter(|v| !v.is_empty()),
            max_connections: env_or("DB_MAX_CONNECTIONS", "10").parse().unwrap_or(10),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_defaults() {
        // Unset prefix falls back to local defaults
        let cfg = StoreConfig::from_env_prefix("PALAVER_UNSET");
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.database, "test");
        assert!(cfg.ca_b64.is_none());
        assert_eq!(cfg.max_connections, 10);
    }

    #[test]
    fn test_store_config_from_env() {
        env::set_var("CFGTEST_DB_HOST", "db.example.com");
        env::set_var("CFGTEST_DB_PORT", "4001");
        env::set_var("CFGTEST_DB_USER", "svc");
        env::set_var("CFGTEST_DB_PASS", "secret");
        env::set_var("CFGTEST_DB_NAME", "chat");
        env::set_var("CFGTEST_DB_CA_B64", "");

        let cfg = StoreConfig::from_env_prefix("CFGTEST_DB");
        assert_eq!(cfg.host, "db.example.com");
        assert_eq!(cfg.port, 4001);
        assert_eq!(cfg.user, "svc");
        assert_eq!(cfg.password, "secret");
        assert_eq!(cfg.database, "chat");
        // Empty CA var is treated as absent
        assert!(cfg.ca_b64.is_none());
    }
}
