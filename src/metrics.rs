//! Prometheus metrics for bridge sessions
//!
//! Exposed on the /metrics endpoint of the API server.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Encoder, Gauge,
    Histogram, TextEncoder,
};

lazy_static! {
    pub static ref QUOTES: CounterVec = register_counter_vec!(
        "bridge_quotes_total",
        "Route quotes requested from the aggregator",
        &["outcome"]
    ).unwrap();

    pub static ref RETRIES: CounterVec = register_counter_vec!(
        "bridge_retries_total",
        "Backoff retries of transient network failures",
        &["operation"]
    ).unwrap();

    pub static ref APPROVALS_SUBMITTED: CounterVec = register_counter_vec!(
        "bridge_approvals_submitted_total",
        "Token approval transactions submitted",
        &["status"]
    ).unwrap();

    pub static ref BRIDGE_TXS_SUBMITTED: CounterVec = register_counter_vec!(
        "bridge_transactions_submitted_total",
        "Bridge transactions submitted on the source chain",
        &["status"]
    ).unwrap();

    pub static ref STATUS_POLLS: CounterVec = register_counter_vec!(
        "bridge_status_polls_total",
        "Cross-chain status polls",
        &["outcome"]
    ).unwrap();

    pub static ref SESSIONS: CounterVec = register_counter_vec!(
        "bridge_sessions_total",
        "Bridge sessions by final state and failure kind",
        &["state", "kind"]
    ).unwrap();

    pub static ref SESSION_IN_FLIGHT: Gauge = register_gauge!(
        "bridge_session_in_flight",
        "1 while a bridge session is running"
    ).unwrap();

    pub static ref SESSION_DURATION: Histogram = register_histogram!(
        "bridge_session_duration_seconds",
        "Wall time from quote to terminal state",
        vec![5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]
    ).unwrap();
}

/// Render all registered metrics in the Prometheus text format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
