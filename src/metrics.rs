//! Prometheus metrics for request tracking and monitoring.
//!
//! This module provides metrics for:
//! - HTTP request counts per route and status
//! - HTTP request latency per route
//! - Writes to the operational error channel

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing::{debug, info};

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// HTTP requests counter metric name.
pub const METRIC_HTTP_REQUESTS: &str = "http_requests_total";
/// Operational errors counter metric name.
pub const METRIC_OPERATIONAL_ERRORS: &str = "operational_errors_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );
    describe_counter!(METRIC_HTTP_REQUESTS, "Total number of HTTP requests served");
    describe_counter!(
        METRIC_OPERATIONAL_ERRORS,
        "Total number of writes to the operational error channel"
    );

    debug!("Metrics initialized");
}

/// Install the Prometheus exporter, serving `/metrics` on `addr`.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Record a served HTTP request.
pub fn record_http_request(start: Instant, route: &'static str, status: u16) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "route" => route).record(latency_ms);
    counter!(METRIC_HTTP_REQUESTS, "route" => route, "status" => status.to_string()).increment(1);
}

/// Increment operational errors counter.
pub fn inc_operational_errors() {
    counter!(METRIC_OPERATIONAL_ERRORS).increment(1);
}
