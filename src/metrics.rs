//! Metrics instrumentation for dnswatch.
//!
//! All metrics are prefixed with `dnswatch.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Probe outcome for metrics.
#[derive(Debug, Clone, Copy)]
pub enum ProbeOutcome {
    /// Query returned at least one usable answer.
    Success,
    /// Timeout, transport error, bad response code or empty answer.
    Failure,
}

/// Record one completed probe.
pub fn record_probe(endpoint: &str, outcome: ProbeOutcome, duration: std::time::Duration) {
    let result_str = match outcome {
        ProbeOutcome::Success => "success",
        ProbeOutcome::Failure => "failure",
    };

    counter!("dnswatch.probe.count", "endpoint" => endpoint.to_string(), "result" => result_str)
        .increment(1);
    histogram!("dnswatch.probe.duration.seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

/// Record a probe result that named an unknown endpoint and was discarded.
pub fn record_unmatched(endpoint: &str) {
    counter!("dnswatch.consolidate.unmatched.count", "endpoint" => endpoint.to_string())
        .increment(1);
}

/// Record one aggregation pass.
pub fn record_aggregate_pass() {
    counter!("dnswatch.aggregate.pass.count").increment(1);
}

/// Record per-endpoint state gauges (call each aggregation pass).
pub fn record_endpoint_gauges(endpoint: &str, history_len: usize, recent_errors: usize) {
    gauge!("dnswatch.state.history.len", "endpoint" => endpoint.to_string())
        .set(history_len as f64);
    gauge!("dnswatch.state.errors.recent", "endpoint" => endpoint.to_string())
        .set(recent_errors as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
