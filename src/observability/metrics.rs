//! Metrics collection and exposition.
//!
//! # Metrics
//! - `catalog_http_dispatches_total` (counter): transport attempts by verb, status
//! - `catalog_http_retries_total` (counter): scheduled retries by verb
//! - `catalog_http_calls_total` (counter): settled calls by verb, outcome
//! - `catalog_http_call_duration_seconds` (histogram): end-to-end call latency
//! - `catalog_http_handshakes_total` (counter): re-authentications by outcome
//! - `catalog_http_gate_waiters` (gauge): calls queued behind the auth gate
//! - `catalog_http_header_degraded_total` (counter): context header reductions by step
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_dispatch(verb: &str, status: i32) {
    counter!(
        "catalog_http_dispatches_total",
        "verb" => verb.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_retry(verb: &str) {
    counter!("catalog_http_retries_total", "verb" => verb.to_string()).increment(1);
}

pub fn record_call(verb: &str, outcome: &'static str, start: Instant) {
    counter!(
        "catalog_http_calls_total",
        "verb" => verb.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("catalog_http_call_duration_seconds", "verb" => verb.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_handshake(outcome: &'static str) {
    counter!("catalog_http_handshakes_total", "outcome" => outcome).increment(1);
}

pub fn record_gate_waiters(count: usize) {
    gauge!("catalog_http_gate_waiters").set(count as f64);
}

pub fn record_header_degraded(step: &'static str) {
    counter!("catalog_http_header_degraded_total", "step" => step).increment(1);
}
