use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use vulcand_sync::config::{load_config, load_store_config};
use vulcand_sync::events::{DispatchOutcome, Dispatcher};
use vulcand_sync::facts::ContainerDescriptor;
use vulcand_sync::lifecycle::startup::build_reconciler;
use vulcand_sync::observability::logging;
use vulcand_sync::orchestration::{ContainerFetcher, DockerCloudClient, StaticFetcher};
use vulcand_sync::reconcile::Reconciler;
use vulcand_sync::store::{keys, ConfigStore, MemoryStore};

#[derive(Parser)]
#[command(name = "vulcand-ctl")]
#[command(about = "Inspect and drive the vulcand route namespace", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "VULCAND_SYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every key under a prefix of the store
    Dump {
        #[arg(default_value = keys::ROOT)]
        prefix: String,
    },
    /// Create the configured listeners if missing
    Listeners,
    /// Feed newline-delimited event payloads through the dispatcher
    Replay {
        file: PathBuf,

        /// Apply to an in-memory store and print the result
        #[arg(long)]
        dry_run: bool,

        /// JSON array of container documents served instead of the API
        #[arg(long, requires = "dry_run")]
        containers: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.command {
        Commands::Replay { dry_run: false, .. } => load_config(cli.config.as_deref())?,
        _ => load_store_config(cli.config.as_deref())?,
    };
    logging::init_with_writer(&config.observability, std::io::stderr)?;

    match cli.command {
        Commands::Dump { prefix } => {
            let reconciler = build_reconciler(&config)?;
            print_tree(reconciler.store(), &prefix).await?;
        }
        Commands::Listeners => {
            let reconciler = build_reconciler(&config)?;
            for step in reconciler.ensure_listeners(&config.listeners).await? {
                println!("{:<16} {}", step.outcome, step.key);
            }
        }
        Commands::Replay {
            file,
            dry_run,
            containers,
        } => {
            let payloads = std::fs::read_to_string(&file)?;
            if dry_run {
                let store = ConfigStore::from_config(Arc::new(MemoryStore::new()), &config.store);
                let reconciler = Reconciler::from_config(store, &config);
                let fetcher = load_containers(containers.as_deref())?;
                let dispatcher = Dispatcher::from_config(reconciler, Arc::new(fetcher), &config);
                replay(&dispatcher, &payloads).await;
                print_tree(dispatcher.reconciler().store(), keys::ROOT).await?;
            } else {
                let reconciler = build_reconciler(&config)?;
                let fetcher: Arc<dyn ContainerFetcher> =
                    Arc::new(DockerCloudClient::new(&config.orchestration)?);
                let dispatcher = Dispatcher::from_config(reconciler, fetcher, &config);
                replay(&dispatcher, &payloads).await;
            }
        }
    }

    Ok(())
}

fn load_containers(path: Option<&Path>) -> Result<StaticFetcher, Box<dyn std::error::Error>> {
    let mut fetcher = StaticFetcher::new();
    if let Some(path) = path {
        let content = std::fs::read_to_string(path)?;
        let containers: Vec<ContainerDescriptor> = serde_json::from_str(&content)?;
        for container in containers {
            fetcher.insert(container)?;
        }
    }
    Ok(fetcher)
}

async fn replay(dispatcher: &Dispatcher, payloads: &str) {
    for (index, line) in payloads.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = index + 1;
        match dispatcher.dispatch(line).await {
            Ok(DispatchOutcome::Ignored) => println!("{line_no}: ignored"),
            Ok(DispatchOutcome::Skipped(reason)) => println!("{line_no}: skipped ({reason})"),
            Ok(DispatchOutcome::Reconciled(report)) => {
                println!("{line_no}: {} {}", report.transition, report.service);
                for step in &report.steps {
                    println!("    {:<16} {}", step.outcome, step.key);
                }
            }
            Err(e) => eprintln!("{line_no}: error: {e}"),
        }
    }
}

async fn print_tree(store: &ConfigStore, prefix: &str) -> Result<(), Box<dyn std::error::Error>> {
    for (key, value) in store.list(prefix).await? {
        println!("{key} = {value}");
    }
    Ok(())
}
