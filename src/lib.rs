//! Mirror Gateway - a path-mirroring reverse proxy for internal services.
//!
//! The gateway is the single public entry point of a small service fleet. A
//! request for `/<service>/<rest>` is forwarded to `http://<service>:<port>/<rest>`
//! with the method, query string, headers and body preserved, and the
//! downstream response is relayed back unchanged. Failures that happen before a
//! downstream answers are reported as a JSON error envelope:
//!
//! ```json
//! {"error":{"type":"<Kind>","message":"<text>"}}
//! ```
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use arc_swap::ArcSwap;
//! use mirror_gateway::{HttpClientAdapter, HttpHandler, MirrorGateway, config::ServerConfig};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = mirror_gateway::config::load_config("config.toml").await?;
//! let client = Arc::new(HttpClientAdapter::new(config.upstream.timeout_duration())?);
//! let gateway = MirrorGateway::from_config(&config, client);
//! let handler = Arc::new(HttpHandler::new(
//!     Arc::new(ArcSwap::from_pointee(gateway)),
//!     Arc::new(ArcSwap::from_pointee(config)),
//! ));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, handler.router()).await?;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! Ports (traits) are kept apart from adapters (implementations) while the
//! forwarding rules live in `core`. The only outbound dependency of `core` is
//! the [`HttpClient`] port, so the gateway can be exercised with an in-memory
//! client.
//!
//! # Error Handling
//! Domain errors are `thiserror` enums; application plumbing returns
//! `eyre::Result<T>` with context attached through `WrapErr`.
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{FileConfigProvider, HttpClientAdapter, HttpHandler},
    core::{ErrorEnvelope, ForwardOutcome, MirrorGateway},
    ports::http_client::HttpClient,
    utils::GracefulShutdown,
};
