use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use eyre::{Result, WrapErr, eyre};
use tokio::{sync::mpsc, time::Instant};

use crate::{
    config::{ServerConfigValidator, models::ServerConfig},
    core::MirrorGateway,
    ports::config_provider::ConfigProvider,
};

type GatewayFactory = dyn Fn(&ServerConfig) -> Result<MirrorGateway> + Send + Sync;

/// Swaps in a new config and gateway when the config source changes.
///
/// The running pair is replaced only after the new config loads, validates
/// and yields a gateway; any failure leaves the old pair serving.
pub struct ConfigReloader {
    provider: Arc<dyn ConfigProvider>,
    config: Arc<ArcSwap<ServerConfig>>,
    gateway: Arc<ArcSwap<MirrorGateway>>,
    build_gateway: Box<GatewayFactory>,
}

impl ConfigReloader {
    pub fn new(
        provider: Arc<dyn ConfigProvider>,
        config: Arc<ArcSwap<ServerConfig>>,
        gateway: Arc<ArcSwap<MirrorGateway>>,
        build_gateway: impl Fn(&ServerConfig) -> Result<MirrorGateway> + Send + Sync + 'static,
    ) -> Self {
        Self {
            provider,
            config,
            gateway,
            build_gateway: Box::new(build_gateway),
        }
    }

    /// Reload once. On error the previous config and gateway stay in place.
    pub async fn reload(&self) -> Result<()> {
        let new_config = self
            .provider
            .load_config()
            .await
            .wrap_err("Failed to load configuration")?;

        ServerConfigValidator::validate(&new_config)
            .map_err(|e| eyre!("Reloaded configuration is invalid: {e}"))?;

        if new_config.listen_addr != self.config.load().listen_addr {
            tracing::warn!(
                "listen_addr changed to {}; a restart is required for it to take effect",
                new_config.listen_addr
            );
        }

        let gateway = (self.build_gateway)(&new_config).wrap_err("Failed to rebuild gateway")?;
        let settings = gateway.settings();
        tracing::info!(
            mount_prefix = %settings.mount_prefix,
            upstream_scheme = %settings.upstream.scheme,
            upstream_port = settings.upstream.port,
            upstream_timeout = %settings.upstream.timeout,
            "Configuration reloaded and gateway swapped"
        );

        self.gateway.store(Arc::new(gateway));
        self.config.store(Arc::new(new_config));
        Ok(())
    }

    /// Reload on every change signal, ignoring signals that arrive within
    /// `debounce` of the previous attempt.
    pub async fn run(self, mut changes: mpsc::Receiver<()>, debounce: Duration) {
        tracing::info!("Config watcher task started.");
        let mut last_attempt: Option<Instant> = None;

        while changes.recv().await.is_some() {
            if last_attempt.is_some_and(|at| at.elapsed() < debounce) {
                tracing::debug!("Debouncing config reload event. Still within cooldown period.");
                while changes.try_recv().is_ok() {}
                continue;
            }
            last_attempt = Some(Instant::now());

            if let Err(e) = self.reload().await {
                tracing::error!("{:#}. Keeping old configuration.", e);
            }
            while changes.try_recv().is_ok() {}
        }
        tracing::info!("Config watcher task is shutting down.");
    }
}
