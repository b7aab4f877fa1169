#![allow(clippy::collapsible_if)]

use std::{net::SocketAddr, time::Duration};

use eyre::Result;

use crate::config::models::{ServerConfig, UpstreamConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Invalid upstream configuration: {message}")]
    InvalidUpstream { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration, reporting every problem at once.
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_mount_prefix(&config.mount_prefix) {
            errors.push(e);
        }

        if config.max_body_bytes == 0 {
            errors.push(ValidationError::InvalidField {
                field: "max_body_bytes".to_string(),
                message: "Body size limit must be greater than 0".to_string(),
            });
        }

        if let Err(mut upstream_errors) = Self::validate_upstream(&config.upstream) {
            errors.append(&mut upstream_errors);
        }

        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&config.logging.level) {
            errors.push(ValidationError::InvalidField {
                field: "logging.level".to_string(),
                message: e.to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8000')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_mount_prefix(prefix: &str) -> ValidationResult<()> {
        if !prefix.starts_with('/') {
            return Err(ValidationError::InvalidField {
                field: "mount_prefix".to_string(),
                message: format!("Mount prefix '{prefix}' must start with '/'"),
            });
        }
        if prefix.contains('?') || prefix.contains('#') {
            return Err(ValidationError::InvalidField {
                field: "mount_prefix".to_string(),
                message: format!("Mount prefix '{prefix}' must be a plain path"),
            });
        }
        Ok(())
    }

    fn validate_upstream(upstream: &UpstreamConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if upstream.scheme != "http" && upstream.scheme != "https" {
            errors.push(ValidationError::InvalidUpstream {
                message: format!(
                    "scheme '{}' is not supported; use 'http' or 'https'",
                    upstream.scheme
                ),
            });
        }

        if upstream.port == 0 {
            errors.push(ValidationError::InvalidUpstream {
                message: "port must be greater than 0".to_string(),
            });
        }

        match humantime::parse_duration(&upstream.timeout) {
            Ok(d) if d == Duration::ZERO => errors.push(ValidationError::InvalidUpstream {
                message: "timeout must be greater than 0".to_string(),
            }),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidUpstream {
                message: format!("timeout '{}' is not a valid duration: {e}", upstream.timeout),
            }),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
