//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (request count, latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `http_requests_total` (counter): total requests by method, status, route
//! - `http_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Route label is the normalized pattern, never the raw path
//! - Histogram buckets tuned for typical web latencies

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), LATENCY_BUCKETS)?
        .install()?;

    metrics::describe_counter!(REQUESTS_TOTAL, "Total HTTP requests handled");
    metrics::describe_histogram!(
        REQUEST_DURATION,
        metrics::Unit::Seconds,
        "HTTP request latency"
    );

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, route: &str, started: Instant) {
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    metrics::histogram!(
        REQUEST_DURATION,
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}
