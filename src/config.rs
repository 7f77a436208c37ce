//! Configuration management for Keygate.

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{KeygateError, Result};
use crate::ratelimit::{EvictionPolicy, LimitConfig};

/// Main configuration for the Keygate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeygateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Prefix every route is mounted under
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,

    /// Answer CORS preflights and allow any origin
    #[serde(default = "default_cors")]
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            route_prefix: default_route_prefix(),
            cors: default_cors(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_route_prefix() -> String {
    "/api".to_string()
}

fn default_cors() -> bool {
    true
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Maximum requests admitted per key per window
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Request header carrying the caller's key
    #[serde(default = "default_key_header")]
    pub key_header: String,

    /// Eviction policy for stale usage records
    #[serde(default)]
    pub eviction: EvictionPolicy,

    /// How often the sweeper runs, in milliseconds
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_ms: default_window_ms(),
            key_header: default_key_header(),
            eviction: EvictionPolicy::default(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

fn default_limit() -> u64 {
    10
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_key_header() -> String {
    "api-key".to_string()
}

fn default_sweep_interval_ms() -> u64 {
    60_000
}

impl RateLimitingConfig {
    /// Governor configuration derived from these settings.
    pub fn limit_config(&self) -> LimitConfig {
        LimitConfig {
            limit: self.limit,
            window: Duration::from_millis(self.window_ms),
            eviction: self.eviction,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// The key header as a parsed header name.
    pub fn key_header_name(&self) -> Result<HeaderName> {
        HeaderName::try_from(self.key_header.as_str()).map_err(|e| {
            KeygateError::Config(format!("invalid key header {:?}: {}", self.key_header, e))
        })
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl KeygateConfig {
    /// Load configuration from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| KeygateError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Check that the configuration describes a usable service.
    pub fn validate(&self) -> Result<()> {
        let rl = &self.rate_limiting;
        if rl.limit == 0 {
            return Err(KeygateError::Config("rate_limiting.limit must be at least 1".into()));
        }
        if rl.window_ms == 0 {
            return Err(KeygateError::Config("rate_limiting.window_ms must be at least 1".into()));
        }
        if rl.sweep_interval_ms == 0 {
            return Err(KeygateError::Config(
                "rate_limiting.sweep_interval_ms must be at least 1".into(),
            ));
        }
        if let EvictionPolicy::Idle { idle_windows: 0 } = rl.eviction {
            return Err(KeygateError::Config(
                "rate_limiting.eviction.idle_windows must be at least 1".into(),
            ));
        }
        rl.key_header_name()?;

        if !self.server.route_prefix.starts_with('/') {
            return Err(KeygateError::Config(format!(
                "server.route_prefix must start with '/', got {:?}",
                self.server.route_prefix
            )));
        }
        Ok(())
    }
}
