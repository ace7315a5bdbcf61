//! dnswatch - A DNS endpoint monitoring sidecar.
//!
//! This crate continuously probes a fixed set of named DNS endpoints,
//! records latency and success/failure history per endpoint, computes
//! rolling-window latency averages and recent-error counts, and exposes
//! a live JSON snapshot plus a liveness probe over HTTP. Consumers poll
//! the status endpoint instead of querying DNS directly.
//!
//! ## Features
//!
//! - One prober task per endpoint, each pinned to its own nameserver
//! - Rolling 1m/5m/15m latency averages over bounded probe history
//! - Restricted mode probing only externally reachable endpoints
//! - Graceful shutdown support
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           dnswatch                             │
//! │                                                                │
//! │  ┌─────────┐                                                   │
//! │  │ Prober  │──┐   bounded    ┌──────────────┐                  │
//! │  ├─────────┤  ├─── mpsc ────▶│ Consolidator │                  │
//! │  │ Prober  │──┘   channel    └──────┬───────┘                  │
//! │  └─────────┘                        ▼                          │
//! │       │ A query            ┌──────────────────┐   ┌──────────┐ │
//! │       ▼ per tick           │   Watch State    │◀──│Aggregator│ │
//! │  (nameservers)             │   (in-memory)    │   └──────────┘ │
//! │                            └────────┬─────────┘                │
//! │                                     │ snapshot                 │
//! │                            ┌────────▼─────────┐                │
//! │                            │  HTTP Reporter   │◀── GET / :6500 │
//! │                            │  (axum)          │    GET /ping   │
//! │                            └──────────────────┘                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use dnswatch::{WatchConfig, WatchServer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config: WatchConfig = load_config();
//!
//!     let cancel = CancellationToken::new();
//!     let server = WatchServer::new(config, "pod-1").unwrap();
//!     server.run(cancel).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod report;
pub mod server;
pub mod state;
pub mod telemetry;

// Re-export main types
pub use config::{Config, EndpointConfig, TelemetryConfig, WatchConfig};
pub use error::WatchError;
pub use server::WatchServer;
pub use state::{EndpointStatus, ProbeResult, WatchState};
