//! Metrics collection and exposition.
//!
//! # Metrics
//! - `issuance_gateway_requests_total` (counter): requests by method, status, route, outcome
//! - `issuance_gateway_request_duration_seconds` (histogram): latency distribution
//! - `issuance_gateway_backend_health` (gauge): 1=healthy, 0=unhealthy
//! - `issuance_gateway_auth_decisions_total` (counter): allow/deny decisions
//! - `issuance_gateway_config_reloads_total` (counter): reloads by result

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, outcome: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
        ("outcome", outcome.to_string()),
    ];
    ::metrics::counter!("issuance_gateway_requests_total", &labels).increment(1);
    ::metrics::histogram!("issuance_gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(pool: &str, address: &str, healthy: bool) {
    ::metrics::gauge!(
        "issuance_gateway_backend_health",
        "pool" => pool.to_string(),
        "address" => address.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_auth_decision(decision: &'static str) {
    ::metrics::counter!("issuance_gateway_auth_decisions_total", "decision" => decision).increment(1);
}

pub fn record_config_reload(result: &'static str) {
    ::metrics::counter!("issuance_gateway_config_reloads_total", "result" => result).increment(1);
}
