//! Configuration module for the FaithConnect backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Minimum usable length of the snapshot encryption key, in bytes.
pub const MIN_BACKUP_KEY_LEN: usize = 32;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory where snapshot files are written
    pub snapshot_dir: PathBuf,
    /// Symmetric key for snapshot encryption; ignored if shorter than 32 bytes
    pub backup_key: Option<String>,
    /// Scheduled backup interval in minutes (None = disabled)
    pub backup_interval_minutes: Option<u64>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("FC_API_PSK").ok();

        let db_path = env::var("FC_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let snapshot_dir = env::var("FC_SNAPSHOT_DIR")
            .unwrap_or_else(|_| "./data/snapshots".to_string())
            .into();

        let backup_key = env::var("FC_BACKUP_KEY").ok().filter(|k| !k.is_empty());

        let backup_interval_minutes = env::var("FC_BACKUP_INTERVAL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&m| m > 0);

        let bind_addr = env::var("FC_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid FC_BIND_ADDR format");

        let log_level = env::var("FC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            api_psk,
            db_path,
            snapshot_dir,
            backup_key,
            backup_interval_minutes,
            bind_addr,
            log_level,
        }
    }

    /// The snapshot encryption key, if one of sufficient length is configured.
    ///
    /// A key shorter than [`MIN_BACKUP_KEY_LEN`] bytes is treated as absent;
    /// snapshots are then written as plaintext JSON.
    pub fn cipher_key(&self) -> Option<&str> {
        self.backup_key
            .as_deref()
            .filter(|k| k.len() >= MIN_BACKUP_KEY_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("FC_API_PSK");
        env::remove_var("FC_DB_PATH");
        env::remove_var("FC_SNAPSHOT_DIR");
        env::remove_var("FC_BACKUP_KEY");
        env::remove_var("FC_BACKUP_INTERVAL_MINUTES");
        env::remove_var("FC_BIND_ADDR");
        env::remove_var("FC_LOG_LEVEL");

        let config = Config::from_env();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/app.sqlite"));
        assert_eq!(config.snapshot_dir, PathBuf::from("./data/snapshots"));
        assert!(config.backup_key.is_none());
        assert!(config.backup_interval_minutes.is_none());
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_short_cipher_key_is_ignored() {
        let config = Config {
            api_psk: None,
            db_path: PathBuf::from("db"),
            snapshot_dir: PathBuf::from("snaps"),
            backup_key: Some("too-short".to_string()),
            backup_interval_minutes: None,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };
        assert!(config.cipher_key().is_none());

        let config = Config {
            backup_key: Some("0123456789abcdef0123456789abcdef".to_string()),
            ..config
        };
        assert!(config.cipher_key().is_some());
    }
}
