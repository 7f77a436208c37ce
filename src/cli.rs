//! Command line interface.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{KeygateConfig, LogFormat};
use crate::error::Result;

/// Per-key request rate governor for HTTP services.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "keygate", version, about)]
pub struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "KEYGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on, keeping the configured bind address
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Maximum requests admitted per key per window
    #[arg(long)]
    pub limit: Option<u64>,

    /// Window length in milliseconds
    #[arg(long)]
    pub window_ms: Option<u64>,

    /// Request header carrying the caller's key
    #[arg(long)]
    pub key_header: Option<String>,

    /// Default log filter, e.g. "info" or "keygate=debug"
    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Args {
    /// Build the effective configuration: file (or defaults), then command line overrides.
    pub fn load_config(&self) -> Result<KeygateConfig> {
        let mut config = match &self.config {
            Some(path) => KeygateConfig::from_file(path)?,
            None => KeygateConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut KeygateConfig) {
        if let Some(port) = self.port {
            config.server.listen_addr.set_port(port);
        }
        if let Some(limit) = self.limit {
            config.rate_limiting.limit = limit;
        }
        if let Some(window_ms) = self.window_ms {
            config.rate_limiting.window_ms = window_ms;
        }
        if let Some(header) = &self.key_header {
            config.rate_limiting.key_header = header.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}
