//! In-memory per-endpoint probe state (the status store).
//!
//! `WatchState` is the single source of truth for the pipeline:
//! the consolidator applies probe results to it, the aggregator
//! recomputes rolling averages and prunes bounded history, and the
//! reporter reads consistent snapshots from it. Locks are held only
//! for the duration of a field update or a snapshot clone, never
//! across I/O.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::metrics;

/// Rolling-average windows: label and span in seconds.
pub const WINDOWS: [(&str, u64); 3] = [("1m", 60), ("5m", 300), ("15m", 900)];

/// Trailing window for kept error timestamps, in seconds.
pub const ERROR_WINDOW_SECS: i64 = 15 * 60;

/// Outcome of one completed probe attempt.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Endpoint name the probe was issued for.
    pub endpoint: String,
    /// Wall-clock completion time.
    pub timestamp: DateTime<Utc>,
    /// Round-trip time of the query.
    pub duration: Duration,
    /// Whether the query returned at least one usable answer.
    pub success: bool,
    /// Resolved addresses in response order. Empty on failure.
    pub addresses: Vec<Ipv4Addr>,
    /// Human-readable cause, present iff `success` is false.
    pub error: Option<String>,
}

impl ProbeResult {
    /// Build a successful result carrying the resolved addresses.
    pub fn success(
        endpoint: impl Into<String>,
        timestamp: DateTime<Utc>,
        duration: Duration,
        addresses: Vec<Ipv4Addr>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            timestamp,
            duration,
            success: true,
            addresses,
            error: None,
        }
    }

    /// Build a failed result carrying the cause.
    pub fn failure(
        endpoint: impl Into<String>,
        timestamp: DateTime<Utc>,
        duration: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            timestamp,
            duration,
            success: false,
            addresses: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Mutable per-endpoint record. Lives for the whole process.
#[derive(Debug, Clone)]
pub struct EndpointRecord {
    /// Endpoint name (unique key).
    pub endpoint: String,
    /// Nameserver this endpoint is queried against.
    pub server: SocketAddr,
    /// Probe history, newest last, truncated by the aggregator.
    pub history: VecDeque<ProbeResult>,
    /// Timestamps of failed probes within the trailing error window.
    pub error_timestamps: Vec<DateTime<Utc>>,
    /// Most recent successful probe, if any.
    pub success_last: Option<DateTime<Utc>>,
    /// Most recent failed probe, if any.
    pub failure_last: Option<DateTime<Utc>>,
    /// Window label -> average latency in milliseconds.
    pub response_times: HashMap<String, f64>,
    /// First address of the most recent successful probe.
    /// Unchanged by failures; empty until the first success.
    pub value: String,
}

impl EndpointRecord {
    fn new(endpoint: &EndpointConfig) -> Self {
        Self {
            endpoint: endpoint.name.clone(),
            server: endpoint.server,
            history: VecDeque::new(),
            error_timestamps: Vec::new(),
            success_last: None,
            failure_last: None,
            response_times: HashMap::new(),
            value: String::new(),
        }
    }
}

/// External (JSON) representation of one endpoint's status.
/// Raw history is internal-only and never appears here.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    /// Nameserver queried for this endpoint.
    #[serde(rename = "DNSServer")]
    pub dns_server: String,
    /// Endpoint name.
    #[serde(rename = "Endpoint")]
    pub endpoint: String,
    /// Failure timestamps within the trailing error window.
    #[serde(rename = "ErrorTimestamps")]
    pub error_timestamps: Vec<DateTime<Utc>>,
    /// Most recent failure, null until one occurs.
    #[serde(rename = "FailureLast")]
    pub failure_last: Option<DateTime<Utc>>,
    /// Rolling latency averages in milliseconds, keyed by window label.
    #[serde(rename = "ResponseTimes")]
    pub response_times: HashMap<String, f64>,
    /// Most recent success, null until one occurs.
    #[serde(rename = "SuccessLast")]
    pub success_last: Option<DateTime<Utc>>,
    /// First address of the most recent successful probe.
    #[serde(rename = "Value")]
    pub value: String,
}

/// Thread-safe store of all endpoint records.
#[derive(Debug, Clone)]
pub struct WatchState {
    inner: Arc<RwLock<WatchStateInner>>,
}

#[derive(Debug)]
struct WatchStateInner {
    /// Endpoint names in configuration order (snapshot output order).
    order: Vec<String>,

    /// endpoint name -> record
    records: HashMap<String, EndpointRecord>,

    /// Rolling window lengths in entries, matching [`WINDOWS`].
    window_lens: [usize; 3],

    /// History bound: the largest window length.
    history_bound: usize,
}

impl WatchState {
    /// Create records for every configured endpoint.
    ///
    /// Window lengths are derived from the probe interval so that each
    /// window spans its nominal duration; the default 5s interval yields
    /// 12/60/180 entries for 1m/5m/15m.
    pub fn new(endpoints: &[EndpointConfig], probe_interval: Duration) -> Self {
        let interval_secs = probe_interval.as_secs().max(1);
        let window_lens =
            WINDOWS.map(|(_, span_secs)| ((span_secs / interval_secs).max(1)) as usize);
        let history_bound = window_lens.iter().copied().max().unwrap_or(1);

        let order: Vec<String> = endpoints.iter().map(|e| e.name.clone()).collect();
        let records = endpoints
            .iter()
            .map(|e| (e.name.clone(), EndpointRecord::new(e)))
            .collect();

        Self {
            inner: Arc::new(RwLock::new(WatchStateInner {
                order,
                records,
                window_lens,
                history_bound,
            })),
        }
    }

    /// Apply one probe result to its endpoint record (consolidation).
    ///
    /// Returns false if the result names an unknown endpoint; the caller
    /// logs and discards it. A nominal success carrying zero addresses is
    /// demoted to a failure here so a malformed response can never update
    /// `value` or `success_last`.
    pub fn apply(&self, mut result: ProbeResult) -> bool {
        let mut inner = self.inner.write();
        let Some(record) = inner.records.get_mut(&result.endpoint) else {
            return false;
        };

        if result.success && result.addresses.is_empty() {
            result.success = false;
            result.error = Some("successful response carried no addresses".to_string());
        }

        if result.success {
            if let Some(addr) = result.addresses.first() {
                record.value = addr.to_string();
            }
            record.success_last = Some(result.timestamp);
        } else {
            record.failure_last = Some(result.timestamp);
            record.error_timestamps.push(result.timestamp);
        }
        record.history.push_back(result);
        true
    }

    /// One aggregation pass over every record: recompute rolling averages,
    /// truncate history to the bound, drop error timestamps older than the
    /// trailing window.
    pub fn aggregate(&self, now: DateTime<Utc>) {
        let mut inner = self.inner.write();
        let window_lens = inner.window_lens;
        let bound = inner.history_bound;
        let cutoff = now - chrono::Duration::seconds(ERROR_WINDOW_SECS);

        for record in inner.records.values_mut() {
            for ((label, _), len) in WINDOWS.iter().zip(window_lens) {
                record
                    .response_times
                    .insert(label.to_string(), average_ms(&record.history, len));
            }

            while record.history.len() > bound {
                record.history.pop_front();
            }

            record.error_timestamps.retain(|t| *t >= cutoff);

            metrics::record_endpoint_gauges(
                &record.endpoint,
                record.history.len(),
                record.error_timestamps.len(),
            );
        }

        metrics::record_aggregate_pass();
        debug!(endpoints = inner.records.len(), "aggregation pass complete");
    }

    /// Consistent copy of all records in configuration order, safe to
    /// serialize without risk of partial updates.
    pub fn snapshot(&self) -> Vec<EndpointStatus> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|name| inner.records.get(name))
            .map(|record| EndpointStatus {
                dns_server: record.server.to_string(),
                endpoint: record.endpoint.clone(),
                error_timestamps: record.error_timestamps.clone(),
                failure_last: record.failure_last,
                response_times: record.response_times.clone(),
                success_last: record.success_last,
                value: record.value.clone(),
            })
            .collect()
    }

    /// Number of configured endpoints.
    pub fn endpoint_count(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Current history length for an endpoint.
    pub fn history_len(&self, endpoint: &str) -> Option<usize> {
        self.inner.read().records.get(endpoint).map(|r| r.history.len())
    }

    /// Error timestamps currently retained for an endpoint.
    pub fn recent_errors(&self, endpoint: &str) -> Option<usize> {
        self.inner
            .read()
            .records
            .get(endpoint)
            .map(|r| r.error_timestamps.len())
    }

    /// History bound in entries (the 15m window length).
    pub fn history_bound(&self) -> usize {
        self.inner.read().history_bound
    }
}

/// Mean latency in milliseconds over the trailing `window` history
/// entries. Shorter history averages what exists; empty history is 0.0.
fn average_ms(history: &VecDeque<ProbeResult>, window: usize) -> f64 {
    let count = history.len().min(window);
    if count == 0 {
        return 0.0;
    }
    let total: f64 = history
        .iter()
        .rev()
        .take(window)
        .map(|r| r.duration.as_secs_f64())
        .sum();
    total / count as f64 * 1000.0
}
