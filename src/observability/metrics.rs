//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by method, status
//! - `edge_request_duration_seconds` (histogram): latency distribution
//! - `edge_access_denied_total` (counter): denials by reason
//! - `edge_origin_selected_total` (counter): mobile / region / default
//! - `edge_upstream_errors_total` (counter): fetch failures by kind
//! - `edge_marker_rewrites_total` (counter): rewritten / malformed
//! - `edge_config_reloads_total` (counter): applied / rejected
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library code
//!   and tests can record freely
//! - Labels are low-cardinality static strings

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

const STANDARD_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "CONNECT", "TRACE",
];

/// Metrics label for a request method. Extension methods share `other`.
pub fn method_label(method: &Method) -> &'static str {
    STANDARD_METHODS
        .into_iter()
        .find(|name| *name == method.as_str())
        .unwrap_or("other")
}

/// Record a completed request.
pub fn record_request(method: &Method, status: u16, start: Instant) {
    counter!(
        "edge_requests_total",
        "method" => method_label(method),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("edge_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record an access denial.
pub fn record_denied(reason: &'static str) {
    counter!("edge_access_denied_total", "reason" => reason).increment(1);
}

/// Record which rule chose the origin.
pub fn record_origin(kind: &'static str) {
    counter!("edge_origin_selected_total", "origin" => kind).increment(1);
}

/// Record a failed upstream fetch.
pub fn record_upstream_error(kind: &'static str) {
    counter!("edge_upstream_errors_total", "kind" => kind).increment(1);
}

/// Record a marker header rewrite attempt.
pub fn record_marker_rewrite(outcome: &'static str) {
    counter!("edge_marker_rewrites_total", "outcome" => outcome).increment(1);
}

/// Record a configuration reload attempt.
pub fn record_config_reload(outcome: &'static str) {
    counter!("edge_config_reloads_total", "outcome" => outcome).increment(1);
}
