//! Per-endpoint DNS probing.
//!
//! Each `Prober` owns a resolver pinned to its endpoint's configured
//! nameserver and issues one A-record query per tick, classifying the
//! outcome into a [`ProbeResult`] sent down the result channel. A full
//! channel blocks the send, which is the intended backpressure; results
//! are never dropped or duplicated within a tick.

use chrono::Utc;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::metrics::{self, ProbeOutcome, Timer};
use crate::state::ProbeResult;

/// Probes one endpoint on a fixed interval.
pub struct Prober {
    endpoint: String,
    query_name: String,
    interval: Duration,
    query_timeout: Duration,
    resolver: TokioAsyncResolver,
    tx: mpsc::Sender<ProbeResult>,
}

impl Prober {
    /// Create a prober whose resolver queries only `server`.
    ///
    /// Caching and retries are disabled so every tick is exactly one
    /// wire query against the configured server.
    pub fn new(
        endpoint: impl Into<String>,
        server: SocketAddr,
        interval: Duration,
        query_timeout: Duration,
        tx: mpsc::Sender<ProbeResult>,
    ) -> Self {
        let endpoint = endpoint.into();

        let mut resolver_config = ResolverConfig::new();
        resolver_config.add_name_server(NameServerConfig {
            socket_addr: server,
            protocol: Protocol::Udp,
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        });

        let mut opts = ResolverOpts::default();
        opts.timeout = query_timeout;
        opts.attempts = 0;
        opts.cache_size = 0;
        opts.use_hosts_file = false;
        opts.recursion_desired = true;

        let resolver = TokioAsyncResolver::tokio(resolver_config, opts);

        Self {
            query_name: fqdn(&endpoint),
            endpoint,
            interval,
            query_timeout,
            resolver,
            tx,
        }
    }

    /// Probe on every tick until cancelled or the channel closes.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticks = tokio::time::interval(self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!(endpoint = %self.endpoint, "prober shutting down");
                    return;
                }

                _ = ticks.tick() => {}
            }

            let result = self.probe_once().await;
            let outcome = if result.success {
                ProbeOutcome::Success
            } else {
                ProbeOutcome::Failure
            };
            metrics::record_probe(&self.endpoint, outcome, result.duration);

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!(endpoint = %self.endpoint, "prober shutting down");
                    return;
                }

                sent = self.tx.send(result) => {
                    if sent.is_err() {
                        debug!(endpoint = %self.endpoint, "result channel closed, prober exiting");
                        return;
                    }
                }
            }
        }
    }

    /// Issue one A-record query and classify the outcome.
    ///
    /// An empty answer set is a failure, never a panic; the resolver
    /// already reports it as an error, and the extra guard covers a
    /// nominally successful lookup with no usable records.
    async fn probe_once(&self) -> ProbeResult {
        let timer = Timer::start();
        // Outer timeout bounds the whole exchange even if the resolver's
        // own timeout misbehaves.
        let outcome = timeout(
            self.query_timeout,
            self.resolver.ipv4_lookup(self.query_name.as_str()),
        )
        .await;
        let elapsed = timer.elapsed();
        let now = Utc::now();

        match outcome {
            Ok(Ok(lookup)) => {
                let addresses: Vec<Ipv4Addr> = lookup.iter().map(|a| a.0).collect();
                if addresses.is_empty() {
                    debug!(endpoint = %self.endpoint, "lookup succeeded with no A records");
                    ProbeResult::failure(
                        self.endpoint.clone(),
                        now,
                        elapsed,
                        "response carried no A records",
                    )
                } else {
                    ProbeResult::success(self.endpoint.clone(), now, elapsed, addresses)
                }
            }
            Ok(Err(err)) => {
                debug!(endpoint = %self.endpoint, error = %err, "lookup failed");
                ProbeResult::failure(self.endpoint.clone(), now, elapsed, describe_failure(&err))
            }
            Err(_) => {
                debug!(endpoint = %self.endpoint, "lookup timed out");
                ProbeResult::failure(self.endpoint.clone(), now, elapsed, "query timed out")
            }
        }
    }
}

/// Human-readable cause for a failed lookup.
fn describe_failure(err: &ResolveError) -> String {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            format!("no A records returned (response code {response_code})")
        }
        ResolveErrorKind::Timeout => "query timed out".to_string(),
        _ => err.to_string(),
    }
}

/// Ensure the query name is fully qualified so no search path applies.
fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}
