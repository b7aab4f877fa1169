pub mod config_reload;
pub mod graceful_shutdown;

pub use config_reload::ConfigReloader;
pub use graceful_shutdown::{GracefulShutdown, ShutdownReason};
