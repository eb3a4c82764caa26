//! vulcand-sync daemon
//!
//! Keeps vulcand's etcd configuration in step with running containers.
//!
//! # Architecture Overview
//!
//! ```text
//!   Docker Cloud                                              etcd
//!   event stream                                        (/vulcand/...)
//!       │                                                     ▲
//!       ▼                                                     │
//!  ┌─────────┐  mpsc  ┌────────────┐   ┌───────────┐   ┌─────────────┐
//!  │ events  │──────▶│ dispatcher │──▶│ reconcile │──▶│    store    │
//!  │ source  │        │ (classify) │   │ (steps)   │   │ (idempotent)│
//!  └─────────┘        └─────┬──────┘   └─────┬─────┘   └─────────────┘
//!                           │                │
//!                           ▼                ▼
//!                    ┌──────────────┐   ┌─────────┐
//!                    │orchestration │   │  facts  │
//!                    │ (fetch)      │   │ (env)   │
//!                    └──────────────┘   └─────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use vulcand_sync::config::load_config;
use vulcand_sync::lifecycle::{signals, startup, Shutdown};
use vulcand_sync::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "vulcand-sync")]
#[command(about = "Sync Docker Cloud containers into vulcand routes", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "VULCAND_SYNC_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vulcand-sync starting");
    tracing::info!(
        store = %config.store.endpoint_url(),
        events = %config.events.url,
        api = %config.orchestration.api_url,
        listeners = config.listeners.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    startup::run(config, shutdown).await?;
    Ok(())
}
