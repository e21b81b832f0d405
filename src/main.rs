//! Synthetic metrics generator CLI.
//!
//! Loads the metric config, starts the generation fleet and serves the
//! HTTP surface until interrupted.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use synthmetrics::fleet::FleetSupervisor;
use synthmetrics::server::{self, AppState, WebPing};
use tracing::{error, info};

/// Serve synthetic Prometheus metrics described by a YAML config file.
#[derive(Debug, Parser)]
#[command(name = "synthmetrics", version)]
struct Args {
    /// Path to the metrics config file; re-read on every reload.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Address to listen on.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Synthetic metrics generator v{}", synthmetrics::VERSION);

    let fleet = Arc::new(FleetSupervisor::new(args.config.clone()));
    if let Err(e) = fleet.start().await {
        error!(
            error = %e,
            config = %args.config.display(),
            "Failed to start metric generation"
        );
        std::process::exit(1);
    }

    let state = AppState {
        fleet: Arc::clone(&fleet),
        webping: WebPing::new(),
    };

    if let Err(e) = server::run(args.listen, state).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    fleet.stop().await;
    info!("Shutdown complete");
}
