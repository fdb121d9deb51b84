//! Server configuration.
//!
//! Loading flow:
//! 1. Start with compiled [`ServerConfig::default()`]
//! 2. If a JSON config file is given, its keys override the defaults
//! 3. `RENDEZVOUS_*` environment variables override the file
//!
//! Command-line flags are applied on top by the binary, followed by
//! [`ServerConfig::validate`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not valid JSON for [`ServerConfig`].
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A value is out of range or inconsistent.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Configuration for the signaling server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Seconds between server Ping frames.
    pub heartbeat_interval_secs: u64,
    /// Seconds of silence after which a connection is dropped.
    pub heartbeat_timeout_secs: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound frames buffered per connection before new ones are dropped.
    pub send_queue_capacity: usize,
    /// Inbound events buffered for the coordinator task.
    pub hub_queue_capacity: usize,
    /// Seconds to wait for tasks during graceful shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            max_connections: 1024,
            heartbeat_interval_secs: 25,
            heartbeat_timeout_secs: 60,
            max_message_size: 1024 * 1024, // 1 MiB
            send_queue_capacity: 256,
            hub_queue_capacity: 1024,
            shutdown_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Load defaults, an optional JSON file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                debug!(?path, "loading config file");
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `RENDEZVOUS_*` overrides read through `lookup`.
    ///
    /// Invalid values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = read("RENDEZVOUS_HOST") {
            self.host = v;
        }
        if let Some(v) = read("RENDEZVOUS_PORT") {
            match parse_u16_range(&v, 0, u16::MAX) {
                Some(port) => self.port = port,
                None => warn!(key = "RENDEZVOUS_PORT", value = %v, "invalid port, ignoring"),
            }
        }
        if let Some(v) = read("RENDEZVOUS_MAX_CONNECTIONS") {
            match parse_usize_range(&v, 1, 1_000_000) {
                Some(n) => self.max_connections = n,
                None => warn!(key = "RENDEZVOUS_MAX_CONNECTIONS", value = %v, "invalid value, ignoring"),
            }
        }
        if let Some(v) = read("RENDEZVOUS_HEARTBEAT_INTERVAL") {
            match parse_u64_range(&v, 1, 3600) {
                Some(n) => self.heartbeat_interval_secs = n,
                None => warn!(key = "RENDEZVOUS_HEARTBEAT_INTERVAL", value = %v, "invalid value, ignoring"),
            }
        }
        if let Some(v) = read("RENDEZVOUS_HEARTBEAT_TIMEOUT") {
            match parse_u64_range(&v, 1, 3600) {
                Some(n) => self.heartbeat_timeout_secs = n,
                None => warn!(key = "RENDEZVOUS_HEARTBEAT_TIMEOUT", value = %v, "invalid value, ignoring"),
            }
        }
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue("host must not be empty".into()));
        }
        if self.max_connections == 0 || self.send_queue_capacity == 0 || self.hub_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "connection and queue capacities must be at least 1".into(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("heartbeat interval must be at least 1s".into()));
        }
        if self.heartbeat_timeout_secs < self.heartbeat_interval_secs {
            return Err(ConfigError::InvalidValue(format!(
                "heartbeat timeout ({}s) is shorter than the interval ({}s)",
                self.heartbeat_timeout_secs, self.heartbeat_interval_secs
            )));
        }
        Ok(())
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Ping interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Silence allowed before a connection is considered dead.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Graceful shutdown budget.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
