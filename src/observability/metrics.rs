//! Metrics collection and exposition.
//!
//! # Metrics
//! - `claim_submissions_total` (counter): submissions by outcome
//! - `claim_tracking_total` (counter): tracking results by outcome
//! - `claim_rpc_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `claim_active_controllers` (gauge): controllers in the registry
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one submission outcome (`accepted` or a `SubmissionError` kind).
pub fn record_submission(outcome: &'static str) {
    ::metrics::counter!("claim_submissions_total", "outcome" => outcome).increment(1);
}

/// Record one finished tracking run.
pub fn record_tracking(outcome: &'static str) {
    ::metrics::counter!("claim_tracking_total", "outcome" => outcome).increment(1);
}

pub fn record_rpc_health(healthy: bool) {
    ::metrics::gauge!("claim_rpc_healthy").set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_active_claims(count: usize) {
    ::metrics::gauge!("claim_active_controllers").set(count as f64);
}
