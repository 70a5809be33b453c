//! Configuration module for the Weekly Pomodoros client.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `POMODOROS_SERVER_URL` | No | `http://127.0.0.1:3000` | Gateway base URL |
//! | `POMODOROS_DATA_DIR` | No | `~/.pomodoros` | Directory holding `cookies.json` |
//! | `POMODOROS_CACHE_STALE_SECS` | No | 3600 | Seconds a fetched todo list stays fresh |
//!
//! # Example
//!
//! ```no_run
//! use pomodoros_client::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Server URL: {}", config.server_url);
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::BaseDirs;
use thiserror::Error;

/// Default gateway URL.
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Default data directory name relative to home.
const DEFAULT_DATA_DIR: &str = ".pomodoros";

/// File name of the persistent cookie jar inside the data directory.
pub const COOKIE_FILE: &str = "cookies.json";

/// Default cache freshness window (one hour).
pub const DEFAULT_CACHE_STALE_SECS: u64 = 60 * 60;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,
}

/// Configuration for the Weekly Pomodoros client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the todo gateway, without a trailing slash.
    pub server_url: String,

    /// Directory holding the persistent cookie jar.
    pub data_dir: PathBuf,

    /// How long a fetched todo list is served without refetching.
    pub cache_stale_after: Duration,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `POMODOROS_SERVER_URL` is not an http(s) URL
    /// - `POMODOROS_CACHE_STALE_SECS` is not a non-negative integer
    /// - `POMODOROS_DATA_DIR` is unset and the home directory cannot be determined
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = match env::var("POMODOROS_SERVER_URL") {
            Ok(url) => parse_server_url(&url)?,
            Err(_) => DEFAULT_SERVER_URL.to_string(),
        };

        let data_dir = match env::var("POMODOROS_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
                base_dirs.home_dir().join(DEFAULT_DATA_DIR)
            }
        };

        let stale_secs = match env::var("POMODOROS_CACHE_STALE_SECS") {
            Ok(val) => val
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "POMODOROS_CACHE_STALE_SECS".to_string(),
                    message: format!("expected non-negative integer, got '{val}'"),
                })?,
            Err(_) => DEFAULT_CACHE_STALE_SECS,
        };

        Ok(Self {
            server_url,
            data_dir,
            cache_stale_after: Duration::from_secs(stale_secs),
        })
    }

    /// Path of the persistent cookie jar.
    #[must_use]
    pub fn cookie_path(&self) -> PathBuf {
        self.data_dir.join(COOKIE_FILE)
    }
}

fn parse_server_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidValue {
            key: "POMODOROS_SERVER_URL".to_string(),
            message: format!("expected http:// or https:// URL, got '{raw}'"),
        });
    }
    Ok(trimmed.to_string())
}
