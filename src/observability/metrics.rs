//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by serving route
//! - `gateway_upstream_errors_total` (counter): proxy failures by kind
//! - `gateway_active_connections` (gauge): registered connection count
//! - `gateway_websocket_tunnels_total` (counter): relays established
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Which part of the chain answered a request.
pub fn record_request(route: &'static str) {
    metrics::counter!("gateway_requests_total", "route" => route).increment(1);
}

pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("gateway_upstream_errors_total", "kind" => kind).increment(1);
}

pub fn set_active_connections(count: usize) {
    metrics::gauge!("gateway_active_connections").set(count as f64);
}

pub fn record_tunnel() {
    metrics::counter!("gateway_websocket_tunnels_total").increment(1);
}
