//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (ingest volume, skips, persistence outcomes)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_webhooks_received_total` (counter): deliveries by endpoint
//! - `gateway_events_ignored_total` (counter): discarded payloads by reason
//! - `gateway_persist_total` (counter): write attempts by adapter, outcome
//! - `gateway_persist_duration_seconds` (histogram): write latency by adapter
//!
//! # Design Decisions
//! - Recording before the recorder is installed is a no-op, so call sites
//!   never need to know whether metrics are enabled
//! - Labels stay bounded: route patterns, adapter names, fixed reasons

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            tracing::info!(address = %addr, "Metrics endpoint started");
        }
        Err(error) => {
            tracing::error!(error = %error, "Failed to install metrics recorder");
        }
    }
}

/// Count one webhook delivery on an ingest route.
pub fn record_webhook_received(endpoint: &str) {
    metrics::counter!(
        "gateway_webhooks_received_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

/// Count one accepted-but-discarded payload.
pub fn record_event_ignored(reason: &'static str) {
    metrics::counter!("gateway_events_ignored_total", "reason" => reason).increment(1);
}

/// Record one persistence attempt with its outcome and latency.
pub fn record_persist(adapter: &'static str, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "gateway_persist_total",
        "adapter" => adapter,
        "outcome" => outcome
    )
    .increment(1);

    metrics::histogram!("gateway_persist_duration_seconds", "adapter" => adapter)
        .record(start.elapsed().as_secs_f64());
}
