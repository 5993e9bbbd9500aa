//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `NODEGATE_CONFIG` env var
//! 3. **Environment variables**: `NODEGATE__*` env vars override specific fields
//! 4. **`PORT`**: overrides `server.bind_port` when set
//!
//! Node address and credentials are not configuration: they arrive with each connect request.
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind_port = 8080
//! base_path = "/api"
//!
//! [upstream]
//! timeout_seconds = 30
//!
//! [logging]
//! format = "json"
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path};

/// HTTP server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `0.0.0.0`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Defaults to `8080`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Prefix every route is mounted under. Defaults to `/api`.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Maximum number of in-flight requests. Defaults to `100`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Maximum accepted request body in bytes. Defaults to `65536`.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    8080
}

fn default_base_path() -> String {
    "/api".to_string()
}

fn default_max_concurrent_requests() -> usize {
    100
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

/// Transport settings for talking to the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSettings {
    /// Per-call timeout in seconds, probe included. Defaults to `30`.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// TCP connect timeout in seconds. Defaults to `5`.
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// Use HTTPS for the node's RPC interface. Defaults to `false`.
    #[serde(default)]
    pub use_tls: bool,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_connect_timeout_seconds() -> u64 {
    5
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset. Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            base_path: default_base_path(),
            max_concurrent_requests: default_max_concurrent_requests(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            use_tls: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Use `__` as a separator for nested fields (e.g. `NODEGATE__SERVER__BIND_PORT=9000`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("NODEGATE").separator("__"));

        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.bind_port", port)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Loads configuration from `config/config.toml`, overridable via `NODEGATE_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if loading fails or the result does not pass
    /// [`validate`](Self::validate).
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("NODEGATE_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        let config = Self::from_file(&config_path)?;
        config.validate().map_err(ConfigError::Message)?;
        Ok(config)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port).parse().map_err(|_| {
            format!("Invalid socket address: {}:{}", self.server.bind_address, self.server.bind_port)
        })
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }

        if !self.server.base_path.starts_with('/') {
            return Err(format!("Base path must start with '/': {}", self.server.base_path));
        }

        if self.server.max_concurrent_requests == 0 {
            return Err("Max concurrent requests must be greater than 0".to_string());
        }

        if self.server.max_body_bytes == 0 {
            return Err("Max body size must be greater than 0".to_string());
        }

        if self.upstream.timeout_seconds == 0 || self.upstream.connect_timeout_seconds == 0 {
            return Err("Upstream timeouts must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        self.socket_addr().map(|_| ())
    }
}
