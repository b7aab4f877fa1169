//! Axum middleware attached to the gateway router.
//!
//! Only observational layers live here: the gateway relays downstream
//! responses unchanged, so nothing in this module touches headers or bodies.
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Log start/end of a request including latency.
pub async fn request_timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    tracing::debug!("Started processing {} {} {:?}", method, uri, version);

    let response = next.run(req).await;
    let duration = start.elapsed();

    tracing::info!(
        "Completed {} {} {:?} - {} in {:?}",
        method,
        uri,
        version,
        response.status(),
        duration
    );

    response
}
