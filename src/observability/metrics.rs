//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vulcand_sync_events_total` (counter): classified events by transition
//! - `vulcand_sync_store_ops_total` (counter): store operations by op, outcome
//! - `vulcand_sync_dispatch_failures_total` (counter): failed events by kind
//! - `vulcand_sync_source_connections_total` (counter): event stream (re)connects

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a classified event.
pub fn record_event(transition: &'static str) {
    metrics::counter!("vulcand_sync_events_total", "transition" => transition).increment(1);
}

/// Record the outcome of one store operation.
pub fn record_store_op(op: &'static str, outcome: &'static str) {
    metrics::counter!("vulcand_sync_store_ops_total", "op" => op, "outcome" => outcome)
        .increment(1);
}

/// Record an event whose handling failed.
pub fn record_dispatch_failure(kind: &'static str) {
    metrics::counter!("vulcand_sync_dispatch_failures_total", "kind" => kind).increment(1);
}

/// Record an event stream connection attempt.
pub fn record_source_connection(outcome: &'static str) {
    metrics::counter!("vulcand_sync_source_connections_total", "outcome" => outcome).increment(1);
}
