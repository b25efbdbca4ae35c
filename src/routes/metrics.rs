//! Prometheus metrics endpoint
//!
//! Exposes relay metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "relaygate_probes_total",
        "Relay health probes by outcome"
    );
    metrics::describe_counter!(
        "relaygate_selections_total",
        "Relay selections by outcome"
    );
    metrics::describe_counter!(
        "relaygate_dispatch_total",
        "Requests dispatched through relays by outcome"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a health probe result
pub fn record_probe(relay: &str, outcome: &str) {
    metrics::counter!(
        "relaygate_probes_total",
        "relay" => relay.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record the outcome of a fresh relay selection
pub fn record_selection(outcome: &str) {
    metrics::counter!("relaygate_selections_total", "outcome" => outcome.to_string())
        .increment(1);
}

/// Record a request dispatched through a relay
pub fn record_dispatch(relay: &str, outcome: &str) {
    metrics::counter!(
        "relaygate_dispatch_total",
        "relay" => relay.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
