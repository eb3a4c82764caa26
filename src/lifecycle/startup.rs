//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the store, reconciler and orchestration client from config
//! - Bootstrap listener records before any event is handled
//! - Spawn the event source and run the dispatcher until shutdown
//!
//! # Design Decisions
//! - Fail fast: any error before the first event is fatal
//! - The dispatcher runs on the calling task; the source is spawned

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::SyncConfig;
use crate::events::{Dispatcher, EventSource};
use crate::lifecycle::shutdown::Shutdown;
use crate::orchestration::{DockerCloudClient, FetchError};
use crate::reconcile::{ReconcileError, Reconciler};
use crate::store::{ConfigStore, EtcdClient, StoreError};

/// Fatal errors before the event loop starts.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create store client: {0}")]
    Store(#[from] StoreError),

    #[error("failed to create orchestration client: {0}")]
    Orchestration(#[from] FetchError),

    #[error("failed to bootstrap listeners: {0}")]
    Listeners(#[from] ReconcileError),
}

/// Build every component for `config`.
pub fn build_reconciler(config: &SyncConfig) -> Result<Reconciler, StartupError> {
    let etcd = EtcdClient::from_config(&config.store)?;
    tracing::info!(endpoint = %etcd.endpoint(), "Using etcd store");
    let store = ConfigStore::from_config(Arc::new(etcd), &config.store);
    Ok(Reconciler::from_config(store, config))
}

/// Run until `shutdown` fires or the event stream ends for good.
pub async fn run(config: SyncConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let reconciler = build_reconciler(&config)?;

    let listeners = reconciler.ensure_listeners(&config.listeners).await?;
    tracing::info!(count = listeners.len(), "Listeners ensured");

    let fetcher = Arc::new(DockerCloudClient::new(&config.orchestration)?);
    let dispatcher = Dispatcher::from_config(reconciler, fetcher, &config);

    let (tx, rx) = mpsc::channel(config.events.channel_capacity);
    let source = EventSource::from_config(&config);
    let source_task = tokio::spawn(source.run(tx, shutdown.subscribe()));

    tracing::info!(url = %config.events.url, "Processing container events");
    dispatcher.run(rx, shutdown.subscribe()).await;

    shutdown.trigger();
    if let Err(e) = source_task.await {
        tracing::error!(error = %e, "Event source task failed");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
