//! Shared test infrastructure for pipeline integration tests.

use chrono::Utc;
use std::time::Duration;

use dnswatch::config::EndpointConfig;
use dnswatch::state::{ProbeResult, WatchState};

pub const PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Build an endpoint config pointing at a placeholder nameserver.
pub fn make_endpoint(name: &str) -> EndpointConfig {
    EndpointConfig {
        name: name.to_string(),
        server: "10.0.0.2:53".parse().unwrap(),
        external: false,
    }
}

/// Build a state with records for the given endpoint names, using the
/// default 5s probe interval (windows 12/60/180).
pub fn make_state(names: &[&str]) -> WatchState {
    let endpoints: Vec<EndpointConfig> = names.iter().map(|n| make_endpoint(n)).collect();
    WatchState::new(&endpoints, PROBE_INTERVAL)
}

/// A successful probe result with the given latency.
pub fn success_result(endpoint: &str, ms: u64) -> ProbeResult {
    ProbeResult::success(
        endpoint,
        Utc::now(),
        Duration::from_millis(ms),
        vec!["192.0.2.1".parse().unwrap()],
    )
}

/// A failed probe result with the given latency.
pub fn failure_result(endpoint: &str, ms: u64) -> ProbeResult {
    ProbeResult::failure(endpoint, Utc::now(), Duration::from_millis(ms), "timed out")
}

/// Poll `condition` until it holds or the deadline passes.
pub async fn wait_for(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
