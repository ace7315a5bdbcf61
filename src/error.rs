//! Error types for dnswatch.

use thiserror::Error;

/// Errors that can occur while running the watcher.
///
/// Probe-level failures (timeouts, bad response codes, empty answers) are
/// never surfaced through this type; they are recorded as failed
/// [`ProbeResult`](crate::state::ProbeResult)s instead.
#[derive(Debug, Error)]
pub enum WatchError {
    /// IO error (socket bind, network, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration, detected before any prober starts
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Snapshot serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
