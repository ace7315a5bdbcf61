//! dnswatch binary entry point.

use clap::Parser;
use dnswatch::{telemetry, Config, WatchServer};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// DNS endpoint monitoring sidecar with a JSON status endpoint.
#[derive(Parser, Debug)]
#[command(name = "dnswatch")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long, default_value = "dnswatch.toml")]
    config: PathBuf,

    /// Probe only endpoints marked external, regardless of the file.
    #[arg(short = 'n', long)]
    restricted: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let mut config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()))
        .add_source(
            config::Environment::with_prefix("DNSWATCH")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    if args.restricted {
        config.watch.restricted = true;
    }

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        listen_addr = %config.watch.listen_addr,
        endpoints = config.watch.endpoints.len(),
        restricted = config.watch.restricted,
        "Starting dnswatch"
    );

    // Host identity for the responding-pod header comes from the
    // environment; the core never computes it.
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());

    // Setup graceful shutdown
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_cancel.cancel();
        }
    });

    // Run the watcher
    let server = WatchServer::new(config.watch, hostname)?;
    let result = server.run(cancel).await;

    if let Err(e) = result {
        error!("dnswatch error: {}", e);
        return Err(e.into());
    }

    info!("dnswatch shutdown complete");
    Ok(())
}
