use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{signal, sync::broadcast};

/// Why the gateway is stopping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGTERM or SIGINT; in-flight requests are drained
    Graceful,
    /// The drain deadline passed or the signal channel went away
    Force,
}

/// Broadcasts a single shutdown event to every interested task.
pub struct GracefulShutdown {
    shutdown_tx: broadcast::Sender<ShutdownReason>,
    shutdown_initiated: Arc<AtomicBool>,
    /// Upper bound on draining in-flight requests after a signal
    drain_timeout: Duration,
}

impl GracefulShutdown {
    /// Create a manager with the default 30-second drain window
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(drain_timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            shutdown_tx,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            drain_timeout,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.shutdown_tx.subscribe()
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Trigger shutdown without an OS signal. Only the first call has an effect.
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            tracing::info!("Shutdown triggered: {:?}", reason);
            // No receivers is fine: waiters also check the flag.
            let _ = self.shutdown_tx.send(reason);
        } else {
            tracing::warn!("Shutdown already initiated, ignoring {:?}", reason);
        }
    }

    /// Listen for SIGINT and SIGTERM and turn the first one into a shutdown.
    pub async fn run_signal_handler(&self) {
        tracing::info!("Signal handler started. Listening for SIGTERM and SIGINT");

        tokio::select! {
            result = signal::ctrl_c() => match result {
                Ok(()) => tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown..."),
                Err(e) => {
                    tracing::error!("Failed to listen for SIGINT: {}", e);
                    std::future::pending::<()>().await;
                }
            },
            _ = wait_for_sigterm() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        self.trigger_shutdown(ShutdownReason::Graceful);
    }

    /// Resolve once shutdown has been requested, including before this call.
    pub async fn wait_for_shutdown_signal(&self) -> ShutdownReason {
        let mut receiver = self.subscribe();
        if self.is_shutdown_initiated() {
            return ShutdownReason::Graceful;
        }

        match receiver.recv().await {
            Ok(reason) => reason,
            Err(_) => {
                tracing::warn!("Shutdown channel closed unexpectedly");
                ShutdownReason::Force
            }
        }
    }

    /// Resolve when draining has run past its deadline.
    pub async fn wait_for_drain_deadline(&self) -> ShutdownReason {
        self.wait_for_shutdown_signal().await;
        tokio::time::sleep(self.drain_timeout).await;
        tracing::error!(
            "Drain timeout exceeded ({}), forcing shutdown",
            humantime::format_duration(self.drain_timeout)
        );
        ShutdownReason::Force
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::error!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await;
}
