use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use mirror_gateway::{
    adapters::{FileConfigProvider, HttpClientAdapter, HttpHandler},
    config::{ServerConfigValidator, loader::load_config, models::ServerConfig},
    core::MirrorGateway,
    metrics,
    ports::{config_provider::ConfigProvider, http_client::HttpClient},
    tracing_setup,
    utils::{ConfigReloader, graceful_shutdown::GracefulShutdown},
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Start the gateway server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
}

/// Build the gateway together with its own outbound client.
///
/// The client is rebuilt on every reload because the outbound timeout lives in it.
fn build_gateway(config: &ServerConfig) -> Result<MirrorGateway> {
    let client: Arc<dyn HttpClient> = Arc::new(
        HttpClientAdapter::new(config.upstream.timeout_duration())
            .context("Failed to create HTTP client adapter")?,
    );
    Ok(MirrorGateway::from_config(config, client))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config).await,
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Serve { config }) => serve(&config).await,
        None => serve(&args.config).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let config_provider: Arc<dyn ConfigProvider> = Arc::new(
        FileConfigProvider::new(config_path).context("Failed to create config provider")?,
    );

    let initial_config: ServerConfig = config_provider
        .load_config()
        .await
        .with_context(|| format!("Failed to load initial config from {config_path}"))?;
    ServerConfigValidator::validate(&initial_config)
        .map_err(|e| eyre!("Invalid configuration in {config_path}:\n{e}"))?;

    tracing_setup::init_tracing(&initial_config.logging)
        .context("Failed to initialize tracing")?;
    metrics::init_metrics().context("Failed to initialize metrics")?;

    let gateway_holder = Arc::new(ArcSwap::from_pointee(build_gateway(&initial_config)?));
    let config_holder = Arc::new(ArcSwap::from_pointee(initial_config));

    match config_provider.watch() {
        Some(changes) => {
            let reloader = ConfigReloader::new(
                config_provider.clone(),
                config_holder.clone(),
                gateway_holder.clone(),
                build_gateway,
            );
            tracing::info!("Watching {} for configuration changes", config_path);
            tokio::spawn(reloader.run(changes, Duration::from_secs(2)));
        }
        None => tracing::warn!("Config watch channel unavailable; hot reload disabled"),
    }

    let graceful_shutdown = Arc::new(GracefulShutdown::new());
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        signal_handler_shutdown.run_signal_handler().await;
    });

    let addr: SocketAddr = {
        let config_ref = config_holder.load();
        config_ref
            .listen_addr
            .parse()
            .context("Failed to parse listen address")?
    };

    {
        let gateway = gateway_holder.load();
        let settings = gateway.settings();
        tracing::info!(
            listen_addr = %addr,
            mount_prefix = %settings.mount_prefix,
            upstream_scheme = %settings.upstream.scheme,
            upstream_port = settings.upstream.port,
            upstream_timeout = %settings.upstream.timeout,
            "Starting Mirror Gateway"
        );
    }

    let http_handler = Arc::new(HttpHandler::new(
        gateway_holder.clone(),
        config_holder.clone(),
    ));
    let app = http_handler.router();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address {addr}"))?;
    println!("Mirror Gateway listening on {addr}");

    let drain_shutdown = graceful_shutdown.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = drain_shutdown.wait_for_shutdown_signal().await;
        tracing::info!("Shutdown signal received: {:?}, draining in-flight requests", reason);
    });

    tokio::select! {
        result = server => {
            result.context("Server error")?;
            tracing::info!("Graceful shutdown completed");
        }
        _ = graceful_shutdown.wait_for_drain_deadline() => {
            tracing::warn!("In-flight requests abandoned at shutdown");
        }
    }

    tracing_setup::shutdown_tracing();
    Ok(())
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        return Err(eyre!("Configuration file '{config_path}' not found"));
    }

    let config = load_config(config_path)
        .await
        .context("Configuration parsing failed")?;
    println!("Configuration parsing: OK");

    match ServerConfigValidator::validate(&config) {
        Ok(()) => {
            println!("Configuration validation: OK");
            println!();
            println!("Configuration Summary:");
            println!("   Listen Address: {}", config.listen_addr);
            println!("   Mount Prefix: {}", config.mount_prefix);
            println!(
                "   Upstream: {}://<service>:{}",
                config.upstream.scheme, config.upstream.port
            );
            println!("   Upstream Timeout: {}", config.upstream.timeout);
            println!("   Max Body Bytes: {}", config.max_body_bytes);
            println!(
                "   Logging: {} ({:?})",
                config.logging.level, config.logging.format
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration validation failed:");
            eprintln!("{e}");
            eprintln!();
            eprintln!("Common fixes:");
            eprintln!("   Verify listen address format (e.g., '0.0.0.0:8000')");
            eprintln!("   Use 'http' or 'https' for upstream.scheme");
            eprintln!("   Write upstream.timeout as a duration such as '30s' or '1m'");
            Err(eyre!("Configuration '{config_path}' is invalid"))
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        return Err(eyre!("Configuration file '{config_path}' already exists"));
    }

    let default_config = r#"# Mirror Gateway Configuration
#
# A request for /<service>/<rest> is forwarded to
# <upstream.scheme>://<service>:<upstream.port>/<rest>

# The address to listen on
listen_addr = "0.0.0.0:8000"

# Only paths below this prefix are mirrored; the prefix is stripped first
mount_prefix = "/"

# Inbound bodies larger than this are rejected with 413
max_body_bytes = 10485760

[upstream]
scheme = "http"
port = 8080
# Bound on one whole downstream exchange
timeout = "30s"

[logging]
# RUST_LOG overrides this when set
level = "info"
# "json" or "pretty"
format = "json"
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("Created default configuration at: {config_path}");
    println!("   Run 'mirror-gateway serve --config {config_path}' to start the server");
    Ok(())
}
