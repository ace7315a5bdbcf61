//! Watcher orchestration and lifecycle management.

use chrono::Utc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::error::WatchError;
use crate::metrics;
use crate::probe::Prober;
use crate::report;
use crate::state::{ProbeResult, WatchState};

/// Result channel capacity: enough to absorb several probers ticking at
/// once without letting a slow consolidation pass stall every prober.
pub const RESULT_CHANNEL_CAPACITY: usize = 10;

/// Drain the result channel and apply each result to the store.
///
/// Single writer of the probe-driven fields; per-endpoint history order
/// is the order results are received here. Results naming an unknown
/// endpoint are logged, counted and discarded.
pub async fn consolidate_loop(
    state: WatchState,
    mut rx: mpsc::Receiver<ProbeResult>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("consolidator shutting down");
                return;
            }

            next = rx.recv() => {
                match next {
                    Some(result) => {
                        let endpoint = result.endpoint.clone();
                        if !state.apply(result) {
                            warn!(endpoint = %endpoint, "discarding probe result for unknown endpoint");
                            metrics::record_unmatched(&endpoint);
                        }
                    }
                    None => {
                        debug!("result channel closed, consolidator exiting");
                        return;
                    }
                }
            }
        }
    }
}

/// Periodically recompute rolling averages and prune bounded history.
pub async fn aggregate_loop(state: WatchState, period: Duration, cancel: CancellationToken) {
    let mut ticks = tokio::time::interval(period);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("aggregator shutting down");
                return;
            }

            _ = ticks.tick() => {
                state.aggregate(Utc::now());
            }
        }
    }
}

/// DNS endpoint watcher: probers, consolidator, aggregator and the
/// HTTP status reporter, wired around one [`WatchState`].
pub struct WatchServer {
    config: WatchConfig,
    state: WatchState,
    hostname: String,
}

impl WatchServer {
    /// Validate the configuration and build the status store.
    ///
    /// `hostname` is the host identity attached to every HTTP response;
    /// it is supplied by the caller, never computed here.
    pub fn new(config: WatchConfig, hostname: impl Into<String>) -> Result<Self, WatchError> {
        config.validate()?;
        let state = WatchState::new(&config.endpoints, config.probe_interval());
        Ok(Self {
            config,
            state,
            hostname: hostname.into(),
        })
    }

    /// Get a reference to the status store.
    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Run until the cancellation token fires.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), WatchError> {
        info!(
            listen_addr = %self.config.listen_addr,
            endpoints = self.config.endpoints.len(),
            restricted = self.config.restricted,
            "Starting dnswatch"
        );

        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);

        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        let active = self.config.active_endpoints();
        info!(active = active.len(), "launching probers");
        for endpoint in active {
            let prober = Prober::new(
                endpoint.name.clone(),
                endpoint.server,
                self.config.probe_interval(),
                self.config.query_timeout(),
                tx.clone(),
            );
            handles.push(tokio::spawn(prober.run(cancel.clone())));
        }
        // The consolidator owns the only receiver; dropping our sender
        // lets the channel close once every prober has stopped.
        drop(tx);

        handles.push(tokio::spawn(consolidate_loop(
            self.state.clone(),
            rx,
            cancel.clone(),
        )));
        handles.push(tokio::spawn(aggregate_loop(
            self.state.clone(),
            self.config.aggregate_interval(),
            cancel.clone(),
        )));

        let router = report::router(self.state.clone(), self.hostname.clone());
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "status endpoint listening");

        let shutdown = cancel.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Waiting for workers to stop...");
        for handle in handles {
            let _ = handle.await;
        }

        info!("dnswatch stopped");
        Ok(())
    }
}
