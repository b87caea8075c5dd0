//! Metrics collection and exposition.
//!
//! # Metrics
//! - `failover_requests_total` (counter): terminal outcomes by provider, outcome
//! - `failover_upstream_duration_seconds` (histogram): time to upstream headers
//! - `failover_client_spawns_total` (counter): client launches by preference
//!
//! # Design Decisions
//! - Recording is always on; without an installed exporter the `metrics`
//!   facade discards updates at negligible cost
//! - The Prometheus exporter is opt-in

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::orchestrator::ProviderPreference;
use crate::routing::Provider;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the terminal outcome of one inference request.
///
/// `provider` is the provider that produced the final answer, if any.
pub fn record_request(provider: Option<Provider>, outcome: &'static str) {
    let provider = provider.map(Provider::as_str).unwrap_or("none");
    counter!("failover_requests_total", "provider" => provider, "outcome" => outcome).increment(1);
}

/// Record the latency of one upstream attempt.
pub fn record_upstream(provider: Provider, start: Instant) {
    histogram!("failover_upstream_duration_seconds", "provider" => provider.as_str())
        .record(start.elapsed().as_secs_f64());
}

/// Record one client process launch.
pub fn record_spawn(preference: ProviderPreference) {
    counter!("failover_client_spawns_total", "preference" => preference.as_str()).increment(1);
}
