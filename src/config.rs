//! Configuration types for dnswatch.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::WatchError;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Watcher configuration.
    pub watch: WatchConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Address for the status HTTP endpoint to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Endpoints to probe, in the order they appear in the status output.
    pub endpoints: Vec<EndpointConfig>,

    /// Seconds between probes of each endpoint.
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Seconds between aggregation passes (rolling averages, pruning).
    #[serde(default = "default_aggregate_interval")]
    pub aggregate_interval_secs: u64,

    /// Upper bound on a single DNS query, in seconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// When set, probe only endpoints marked `external`.
    /// Records are still kept for every configured endpoint.
    #[serde(default)]
    pub restricted: bool,
}

/// One monitored endpoint: a DNS name and the server to query it against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// DNS name to resolve (A records).
    pub name: String,

    /// Nameserver to query, e.g. "8.8.8.8:53".
    pub server: SocketAddr,

    /// Endpoint is reachable from outside the cluster.
    /// Only external endpoints are probed in restricted mode.
    #[serde(default)]
    pub external: bool,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "dnswatch=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

impl WatchConfig {
    /// Interval between probes of one endpoint.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    /// Interval between aggregation passes.
    pub fn aggregate_interval(&self) -> Duration {
        Duration::from_secs(self.aggregate_interval_secs)
    }

    /// Upper bound on a single DNS query.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Endpoints that get a prober under the current mode.
    pub fn active_endpoints(&self) -> Vec<&EndpointConfig> {
        self.endpoints
            .iter()
            .filter(|e| !self.restricted || e.external)
            .collect()
    }

    /// Validate the configuration. Must pass before any prober starts.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.endpoints.is_empty() {
            return Err(WatchError::Config("no endpoints configured".into()));
        }

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.name.is_empty() {
                return Err(WatchError::Config("endpoint with empty name".into()));
            }
            if !seen.insert(endpoint.name.as_str()) {
                return Err(WatchError::Config(format!(
                    "duplicate endpoint name: {}",
                    endpoint.name
                )));
            }
        }

        if self.probe_interval_secs == 0 {
            return Err(WatchError::Config("probe_interval_secs must be > 0".into()));
        }
        if self.aggregate_interval_secs == 0 {
            return Err(WatchError::Config(
                "aggregate_interval_secs must be > 0".into(),
            ));
        }
        if self.query_timeout_secs == 0 {
            return Err(WatchError::Config("query_timeout_secs must be > 0".into()));
        }

        if self.active_endpoints().is_empty() {
            return Err(WatchError::Config(
                "restricted mode leaves no external endpoints to probe".into(),
            ));
        }

        Ok(())
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 6500))
}

fn default_probe_interval() -> u64 {
    5
}

fn default_aggregate_interval() -> u64 {
    2
}

fn default_query_timeout() -> u64 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}
