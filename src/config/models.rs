//! Configuration data structures for the mirror gateway.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files. They are
//! serde‑friendly and include defaults so that an empty config file is a valid one.
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_mount_prefix() -> String {
    "/".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_upstream_port() -> u16 {
    8080
}

fn default_timeout() -> String {
    "30s".to_string()
}

/// How every internal service is reached. One scheme and one port are used
/// uniformly; the host is always the service segment of the inbound path.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_upstream_port")]
    pub port: u16,
    /// Bound on a single outbound exchange, parsed by humantime ("30s", "2m").
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl UpstreamConfig {
    /// Parsed outbound timeout. Falls back to 30s on an unparseable value;
    /// the validator rejects those before a gateway is built from them.
    pub fn timeout_duration(&self) -> Duration {
        humantime::parse_duration(&self.timeout).unwrap_or(Duration::from_secs(30))
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            port: default_upstream_port(),
            timeout: default_timeout(),
        }
    }
}

/// Log output format.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Path prefix the gateway is mounted under; the service segment is the
    /// first segment after it.
    #[serde(default = "default_mount_prefix")]
    pub mount_prefix: String,
    /// Cap on buffered inbound request bodies.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Create a new server configuration builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            mount_prefix: default_mount_prefix(),
            max_body_bytes: default_max_body_bytes(),
            upstream: UpstreamConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Builder for ServerConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the mount prefix
    pub fn mount_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.mount_prefix = prefix.into();
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config.max_body_bytes = limit;
        self
    }

    /// Set the scheme used to reach internal services
    pub fn upstream_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.upstream.scheme = scheme.into();
        self
    }

    /// Set the port shared by every internal service
    pub fn upstream_port(mut self, port: u16) -> Self {
        self.config.upstream.port = port;
        self
    }

    /// Set the outbound timeout (humantime syntax)
    pub fn upstream_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.config.upstream.timeout = timeout.into();
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Build the final ServerConfig
    pub fn build(self) -> ServerConfig {
        self.config
    }
}
