use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::ServerConfig;

/// Prefix for environment overrides, e.g. `MIRROR__UPSTREAM__PORT=9090`.
pub const ENV_PREFIX: &str = "MIRROR";

/// Load configuration from a file using the config crate
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<ServerConfig> {
    load_config_sync(config_path)
}

fn file_format(config_path: &Path) -> FileFormat {
    match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml,
    }
}

/// Load configuration synchronously, layering environment overrides on top
/// of the file.
pub fn load_config_sync(config_path: &str) -> Result<ServerConfig> {
    load_with_env_prefix(config_path, ENV_PREFIX)
}

/// `{prefix}__SECTION__KEY` overrides `section.key`; top-level keys drop the
/// section (`{prefix}__MAX_BODY_BYTES`).
fn load_with_env_prefix(config_path: &str, env_prefix: &str) -> Result<ServerConfig> {
    let config_path = Path::new(config_path);

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            file_format(config_path),
        ))
        .add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let server_config: ServerConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(server_config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[tokio::test]
    async fn test_load_toml_config() {
        let toml_content = r#"
listen_addr = "127.0.0.1:3000"
mount_prefix = "/api"

[upstream]
scheme = "http"
port = 9000
timeout = "5s"

[logging]
level = "debug"
format = "pretty"
"#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.mount_prefix, "/api");
        assert_eq!(config.upstream.port, 9000);
        assert_eq!(config.upstream.timeout, "5s");
        assert_eq!(config.logging.level, "debug");
    }

    #[tokio::test]
    async fn test_load_yaml_config_with_defaults() {
        let yaml_content = r#"
listen_addr: "127.0.0.1:3000"
upstream:
  port: 8081
"#;

        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.mount_prefix, "/");
        assert_eq!(config.upstream.port, 8081);
        assert_eq!(config.upstream.scheme, "http");
        assert_eq!(config.upstream.timeout, "30s");
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let json_content = r#"
{
  "listen_addr": "127.0.0.1:3000",
  "upstream": { "scheme": "https", "port": 8443 }
}
"#;

        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, "{}", json_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.upstream.scheme, "https");
        assert_eq!(config.upstream.port, 8443);
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", content).unwrap();
        temp_file
    }

    // Each override test owns its prefix, so parallel tests never see its variables.
    #[test]
    fn test_env_overrides_nested_key() {
        let temp_file = write_toml("[upstream]\nport = 8080\n");
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("MIRROR_NESTED_TEST__UPSTREAM__PORT", "9090") };

        let config =
            load_with_env_prefix(temp_file.path().to_str().unwrap(), "MIRROR_NESTED_TEST");
        unsafe { std::env::remove_var("MIRROR_NESTED_TEST__UPSTREAM__PORT") };

        let config = config.unwrap();
        assert_eq!(config.upstream.port, 9090);
        assert_eq!(config.upstream.scheme, "http");
    }

    #[test]
    fn test_env_overrides_top_level_key() {
        let temp_file = write_toml("max_body_bytes = 1024\n[upstream]\nport = 8080\n");
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("MIRROR_TOP_TEST__MAX_BODY_BYTES", "4096") };

        let config = load_with_env_prefix(temp_file.path().to_str().unwrap(), "MIRROR_TOP_TEST");
        unsafe { std::env::remove_var("MIRROR_TOP_TEST__MAX_BODY_BYTES") };

        let config = config.unwrap();
        assert_eq!(config.max_body_bytes, 4096);
        assert_eq!(config.upstream.port, 8080);
    }

    #[test]
    fn test_unprefixed_env_is_ignored() {
        let temp_file = write_toml("[upstream]\nport = 8080\n");
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("OTHER_PREFIX_TEST__UPSTREAM__PORT", "9999") };

        let config = load_with_env_prefix(temp_file.path().to_str().unwrap(), "MIRROR_IGNORE_TEST");
        unsafe { std::env::remove_var("OTHER_PREFIX_TEST__UPSTREAM__PORT") };

        assert_eq!(config.unwrap().upstream.port, 8080);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let result = load_config("/definitely/not/here/config.toml").await;
        assert!(result.is_err());
    }
}
