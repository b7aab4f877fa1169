use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize structured logging from the `[logging]` config section.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .wrap_err_with(|| format!("Invalid log level: {}", logging.level))?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    match logging.format {
        LogFormat::Json => Registry::default()
            .with(env_filter)
            .with(fmt_layer.json().with_current_span(false).with_span_list(true))
            .try_init()
            .wrap_err("Failed to install JSON tracing subscriber")?,
        LogFormat::Pretty => Registry::default()
            .with(env_filter)
            .with(fmt_layer.pretty().with_ansi(true))
            .try_init()
            .wrap_err("Failed to install pretty tracing subscriber")?,
    }

    tracing::info!(
        level = %logging.level,
        format = ?logging.format,
        "Mirror gateway logging initialized"
    );
    Ok(())
}

/// Shutdown tracing gracefully
pub fn shutdown_tracing() {
    // tracing-subscriber has no explicit flush; the fmt layer writes synchronously
    tracing::info!("Mirror gateway tracing shutdown complete");
}

/// Create a request-scoped tracing span
pub fn create_request_span(method: &str, path: &str, request_id: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        http.method = method,
        http.path = path,
        request.id = request_id,
        http.status_code = tracing::field::Empty,
    )
}

/// Create a span for one call to an internal service
pub fn create_upstream_span(authority: &str, method: &str, path: &str) -> tracing::Span {
    tracing::info_span!(
        "upstream_request",
        upstream.authority = authority,
        http.method = method,
        http.path = path,
        http.status_code = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_rejects_second_install() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Json,
        };
        // Whichever test installs first wins; a second install must error, not panic.
        let _ = init_tracing(&logging);
        assert!(init_tracing(&logging).is_err());
    }

    #[test]
    fn test_create_request_span() {
        let span = create_request_span("GET", "/chats/rooms", "req-123");
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "request");
        }
    }

    #[test]
    fn test_create_upstream_span() {
        let span = create_upstream_span("chats:8080", "POST", "/rooms");
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "upstream_request");
        }
    }
}
