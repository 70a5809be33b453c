//! Server configuration module.
//!
//! Parses configuration from environment variables for the Weekly Pomodoros server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PORT` | No | 3000 | HTTP server port |
//! | `POMODOROS_BIND_ADDR` | No | `0.0.0.0` | Address to bind |
//! | `POMODOROS_TODO_TTL_DAYS` | No | 7 | Lifetime of the `todos` cookie, refreshed on every write |
//! | `POMODOROS_ENFORCE_DATE_GUARD` | No | false | Reject past-dated mutations on the server too |
//! | `POMODOROS_MAX_BODY_BYTES` | No | 65536 | Request body size limit |

use std::env;
use std::net::IpAddr;

use thiserror::Error;
use tracing::warn;

use crate::store::DEFAULT_TTL_DAYS;

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 3000;

/// Default bind address.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Default request body limit.
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),

    /// Configuration validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,

    /// Address the listener binds to.
    pub bind_addr: IpAddr,

    /// Days until the `todos` cookie expires after a write.
    pub todo_ttl_days: u32,

    /// When true, the gateway applies the calendar-day guard itself instead
    /// of trusting the client.
    pub enforce_date_guard: bool,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            todo_ttl_days: DEFAULT_TTL_DAYS,
            enforce_date_guard: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Port number is not a valid u16
    /// - The bind address is not an IP address
    /// - A numeric setting is malformed or zero
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pomodoros_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            port: parse_port()?,
            bind_addr: parse_bind_addr()?,
            todo_ttl_days: parse_positive("POMODOROS_TODO_TTL_DAYS", DEFAULT_TTL_DAYS)?,
            enforce_date_guard: parse_bool_env("POMODOROS_ENFORCE_DATE_GUARD"),
            max_body_bytes: parse_positive("POMODOROS_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
        };

        config.validate()?;

        if !config.enforce_date_guard {
            warn!(
                "POMODOROS_ENFORCE_DATE_GUARD is disabled - past-date checks rely on the client"
            );
        }

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.todo_ttl_days > 3650 {
            return Err(ConfigError::ValidationError(format!(
                "POMODOROS_TODO_TTL_DAYS must be at most 3650, got {}",
                self.todo_ttl_days
            )));
        }
        Ok(())
    }
}

/// Parse a boolean environment variable.
///
/// Returns `true` if the variable is set to "true" (case-insensitive),
/// `false` otherwise.
fn parse_bool_env(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Parse the PORT environment variable.
///
/// Returns the default port if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match env::var("PORT") {
        Ok(port_str) => Ok(port_str.parse()?),
        Err(env::VarError::NotPresent) => Ok(DEFAULT_PORT),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: "PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

fn parse_bind_addr() -> Result<IpAddr, ConfigError> {
    let raw = env::var("POMODOROS_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidFormat {
            var: "POMODOROS_BIND_ADDR".to_string(),
            message: format!("expected an IP address, got '{raw}'"),
        })
}

/// Parse a strictly positive integer, falling back to `default` when unset.
fn parse_positive<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };

    let value = raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidFormat {
        var: name.to_string(),
        message: format!("expected positive integer, got '{raw}'"),
    })?;

    if value == T::default() {
        return Err(ConfigError::InvalidFormat {
            var: name.to_string(),
            message: "must be greater than 0".to_string(),
        });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing.
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            let old_value = env::var(key).ok();
            self.vars.push((key.to_string(), old_value));
            env::set_var(key, value);
        }

        fn remove(&mut self, key: &str) {
            let old_value = env::var(key).ok();
            self.vars.push((key.to_string(), old_value));
            env::remove_var(key);
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.iter().rev() {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    fn clear_all(guard: &mut EnvGuard) {
        for key in [
            "PORT",
            "POMODOROS_BIND_ADDR",
            "POMODOROS_TODO_TTL_DAYS",
            "POMODOROS_ENFORCE_DATE_GUARD",
            "POMODOROS_MAX_BODY_BYTES",
        ] {
            guard.remove(key);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);

        let config = Config::from_env().expect("should parse config");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.todo_ttl_days, 7);
        assert!(!config.enforce_date_guard);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    #[serial]
    fn test_config_custom_values() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("PORT", "9090");
        guard.set("POMODOROS_BIND_ADDR", "127.0.0.1");
        guard.set("POMODOROS_TODO_TTL_DAYS", "14");
        guard.set("POMODOROS_ENFORCE_DATE_GUARD", "TRUE");
        guard.set("POMODOROS_MAX_BODY_BYTES", "1024");

        let config = Config::from_env().expect("should parse config");
        assert_eq!(config.port, 9090);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1");
        assert_eq!(config.todo_ttl_days, 14);
        assert!(config.enforce_date_guard);
        assert_eq!(config.max_body_bytes, 1024);
    }

    #[test]
    #[serial]
    fn test_parse_port_invalid() {
        let mut guard = EnvGuard::new();
        guard.set("PORT", "not-a-number");

        let result = parse_port();
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidPort(_)));
    }

    #[test]
    #[serial]
    fn test_parse_port_out_of_range() {
        let mut guard = EnvGuard::new();
        guard.set("PORT", "99999");

        assert!(parse_port().is_err());
    }

    #[test]
    #[serial]
    fn test_bind_addr_invalid() {
        let mut guard = EnvGuard::new();
        guard.set("POMODOROS_BIND_ADDR", "localhost:80");

        let err = parse_bind_addr().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidFormat { ref var, .. } if var == "POMODOROS_BIND_ADDR")
        );
    }

    #[test]
    #[serial]
    fn test_ttl_zero_rejected() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("POMODOROS_TODO_TTL_DAYS", "0");

        assert!(Config::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_ttl_too_large_rejected() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("POMODOROS_TODO_TTL_DAYS", "100000");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    #[serial]
    fn test_parse_bool_env_false_for_other_values() {
        let mut guard = EnvGuard::new();
        guard.set("TEST_POMODOROS_BOOL", "yes");
        assert!(!parse_bool_env("TEST_POMODOROS_BOOL"));

        guard.remove("TEST_POMODOROS_BOOL");
        assert!(!parse_bool_env("TEST_POMODOROS_BOOL"));
    }
}
