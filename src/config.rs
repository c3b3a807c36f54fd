//! Runtime configuration for ollama-relay.
//!
//! Configuration is loaded from a JSON file (missing fields fall back to
//! defaults), then selected environment variables are layered on top. The
//! result is immutable for the lifetime of the process.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "ollama-relay", about = "HTTP relay for a local Ollama runtime")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file).
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Upstream backend configuration.
    pub backend: BackendConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8000").
    pub listen: String,

    /// Prefix every API route is mounted under.
    pub api_prefix: String,

    /// Origins allowed by CORS. `"*"` allows any origin.
    pub allowed_origins: Vec<String>,

    /// Name reported by the root endpoint.
    pub app_name: String,

    /// Version reported by the root endpoint.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
            api_prefix: "/api/v1".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://localhost:8080".to_string(),
                "http://127.0.0.1:8080".to_string(),
                "*".to_string(),
            ],
            app_name: "Ollama Chat API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Inference backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base address of the Ollama server.
    pub host: String,

    /// Model used when a request doesn't name one.
    pub default_model: String,

    /// Timeout for the health probe, in seconds. Chat calls have no timeout.
    pub probe_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            default_model: "mistral:latest".to_string(),
            probe_timeout_secs: 5,
        }
    }
}

impl BackendConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Configuration rejected by [`Config::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("backend host must not be empty")]
    EmptyHost,

    #[error("default model must not be empty")]
    EmptyDefaultModel,

    #[error("api prefix must start with '/': {0:?}")]
    BadPrefix(String),

    #[error("probe timeout must be at least one second")]
    ZeroProbeTimeout,
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (environment-shaped keys).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.backend.host = host;
        }
        if let Some(model) = lookup("DEFAULT_MODEL") {
            self.backend.default_model = model;
        }
        if let Some(prefix) = lookup("API_PREFIX") {
            self.server.api_prefix = prefix;
        }
        if let Some(listen) = lookup("LISTEN_ADDR") {
            self.server.listen = listen;
        }
    }

    /// Check the invariants the relay relies on at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.backend.default_model.trim().is_empty() {
            return Err(ConfigError::EmptyDefaultModel);
        }
        if !self.server.api_prefix.starts_with('/') {
            return Err(ConfigError::BadPrefix(self.server.api_prefix.clone()));
        }
        if self.backend.probe_timeout_secs == 0 {
            return Err(ConfigError::ZeroProbeTimeout);
        }
        Ok(())
    }

    /// Backend host with any trailing slash removed, ready for path joins.
    pub fn backend_base_url(&self) -> String {
        self.backend.host.trim_end_matches('/').to_string()
    }
}
