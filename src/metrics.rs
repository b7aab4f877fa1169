//! Lightweight metrics helpers for the mirror gateway.
//!
//! This module exposes a small set of convenience functions and RAII timers
//! wrapping the `metrics` crate macros. It does not embed a concrete exporter
//! (the application can install any compatible recorder) while still
//! describing the gateway's metric names.
//!
//! Provided metrics (labels vary by family):
//! * `mirror_requests_total` (counter)
//! * `mirror_request_duration_seconds` (histogram)
//! * `mirror_upstream_requests_total` (counter)
//! * `mirror_upstream_request_duration_seconds` (histogram)
//!
//! The `*Timer` structs leverage `Drop` to record durations even when the
//! surrounding future returns early.
use std::time::{Duration, Instant};

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::Lazy;

pub const MIRROR_REQUESTS_TOTAL: &str = "mirror_requests_total";
pub const MIRROR_REQUEST_DURATION_SECONDS: &str = "mirror_request_duration_seconds";
pub const MIRROR_UPSTREAM_REQUESTS_TOTAL: &str = "mirror_upstream_requests_total";
pub const MIRROR_UPSTREAM_REQUEST_DURATION_SECONDS: &str =
    "mirror_upstream_request_duration_seconds";

static DESCRIPTIONS: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        MIRROR_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of inbound requests answered by the gateway."
    );
    describe_histogram!(
        MIRROR_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of inbound requests answered by the gateway."
    );
    describe_counter!(
        MIRROR_UPSTREAM_REQUESTS_TOTAL,
        Unit::Count,
        "Forwarding attempts by service and outcome."
    );
    describe_histogram!(
        MIRROR_UPSTREAM_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of calls to internal services."
    );
});

/// Increment the total request counter for an inbound request.
pub fn increment_request_total(method: &str, status: u16) {
    counter!(
        MIRROR_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a completed inbound request's duration.
pub fn record_request_duration(method: &str, duration: Duration) {
    histogram!(MIRROR_REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(duration.as_secs_f64());
}

/// Count one forwarding attempt. `outcome` is a [`ForwardOutcome`] label.
///
/// [`ForwardOutcome`]: crate::core::exchange::ForwardOutcome
pub fn increment_upstream_request_total(service: &str, outcome: &str) {
    counter!(
        MIRROR_UPSTREAM_REQUESTS_TOTAL,
        "service" => service.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a completed upstream call duration.
pub fn record_upstream_request_duration(service: &str, duration: Duration) {
    histogram!(MIRROR_UPSTREAM_REQUEST_DURATION_SECONDS, "service" => service.to_string())
        .record(duration.as_secs_f64());
}

/// RAII helper measuring inbound request duration.
pub struct RequestTimer {
    start: Instant,
    method: String,
}

impl RequestTimer {
    pub fn new(method: &str) -> Self {
        Self {
            start: Instant::now(),
            method: method.to_string(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        record_request_duration(&self.method, self.start.elapsed());
    }
}

/// RAII helper measuring one upstream call.
pub struct UpstreamRequestTimer {
    start: Instant,
    service: String,
}

impl UpstreamRequestTimer {
    pub fn new(service: &str) -> Self {
        Self {
            start: Instant::now(),
            service: service.to_string(),
        }
    }
}

impl Drop for UpstreamRequestTimer {
    fn drop(&mut self) {
        record_upstream_request_duration(&self.service, self.start.elapsed());
    }
}

/// Register metric descriptions (idempotent).
pub fn init_metrics() -> eyre::Result<()> {
    tracing::info!("Initializing mirror gateway metrics");
    Lazy::force(&DESCRIPTIONS);
    Ok(())
}
