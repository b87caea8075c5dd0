//! Local failover proxy daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │               FAILOVER PROXY                  │
//!   Local client          │  ┌────────┐   ┌──────────┐   ┌────────────┐  │
//!   ──────────────────────┼─▶│  http  │──▶│ routing  │──▶│  upstream  │──┼──▶ Bedrock (primary)
//!   POST /v1/messages     │  │ server │   │ failover │   │ forwarder  │──┼──▶ Anthropic (secondary)
//!                         │  └────────┘   └────┬─────┘   └────────────┘  │
//!   GET /health ──────────┼──────────────────▶ │ health/stats            │
//!                         │  config · credentials · lifecycle · metrics   │
//!                         └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use provider_failover::config::{default_config, load_config, EnvCredentials};
use provider_failover::lifecycle::{startup, Shutdown};
use provider_failover::observability::{logging, metrics};
use provider_failover::HttpServer;

#[derive(Parser)]
#[command(name = "provider-failover")]
#[command(about = "Loopback inference proxy with primary/secondary provider failover", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("provider-failover v{} starting", env!("CARGO_PKG_VERSION"));

    let credentials = Arc::new(EnvCredentials::new(&config.credentials));
    let mode = startup::preflight(&config, credentials.as_ref())?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        mode = %mode,
        idle_timeout_secs = config.timeouts.idle_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, credentials)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
