//! Event dispatcher.
//!
//! # Responsibilities
//! - Decode and classify each payload
//! - Resolve the container through the orchestration API
//! - Hand the transition to the reconciler under a per-event deadline
//!
//! # Design Decisions
//! - One signal at a time, in arrival order
//! - Every failure is terminal for its event only; the loop keeps going

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::events::types::{RawEvent, SourceSignal};
use crate::facts::FactError;
use crate::observability::metrics;
use crate::orchestration::{ContainerFetcher, FetchError};
use crate::reconcile::{ReconcileError, ReconcileOutcome, ReconcileReport, Reconciler, Transition};

/// Result of an event that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a transition this system acts on.
    Ignored,
    /// Container lacked the facts needed to publish it.
    Skipped(FactError),
    Reconciled(ReconcileReport),
}

/// Why an event was abandoned.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed event payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{transition} event has no resource_uri")]
    MissingResourceUri { transition: Transition },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("event not handled within {0:?}")]
    Timeout(Duration),
}

impl DispatchError {
    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::MissingResourceUri { .. } => "missing_resource_uri",
            Self::Fetch(_) => "fetch",
            Self::Reconcile(_) => "reconcile",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Routes source signals into the reconciler.
pub struct Dispatcher {
    reconciler: Reconciler,
    fetcher: Arc<dyn ContainerFetcher>,
    event_timeout: Duration,
}

impl Dispatcher {
    pub fn new(reconciler: Reconciler, fetcher: Arc<dyn ContainerFetcher>, event_timeout: Duration) -> Self {
        Self {
            reconciler,
            fetcher,
            event_timeout,
        }
    }

    pub fn from_config(reconciler: Reconciler, fetcher: Arc<dyn ContainerFetcher>, config: &SyncConfig) -> Self {
        Self::new(
            reconciler,
            fetcher,
            Duration::from_secs(config.events.event_timeout_secs),
        )
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Handle one raw payload.
    pub async fn dispatch(&self, payload: &str) -> Result<DispatchOutcome, DispatchError> {
        let event = RawEvent::decode(payload)?;
        let Some(transition) = event.classify() else {
            tracing::trace!(
                resource_type = ?event.resource_type,
                action = ?event.action,
                state = ?event.state,
                "Ignoring event"
            );
            return Ok(DispatchOutcome::Ignored);
        };
        metrics::record_event(transition.as_str());

        let resource_uri = event
            .resource_uri
            .filter(|uri| !uri.is_empty())
            .ok_or(DispatchError::MissingResourceUri { transition })?;
        tracing::debug!(%transition, %resource_uri, "Classified event");

        let handled = async {
            let descriptor = self.fetcher.fetch(&resource_uri).await?;
            let outcome = self.reconciler.apply(transition, &descriptor).await?;
            Ok::<_, DispatchError>(outcome)
        };
        let outcome = tokio::time::timeout(self.event_timeout, handled)
            .await
            .map_err(|_| DispatchError::Timeout(self.event_timeout))??;

        Ok(match outcome {
            ReconcileOutcome::Applied(report) => DispatchOutcome::Reconciled(report),
            ReconcileOutcome::Skipped(reason) => DispatchOutcome::Skipped(reason),
        })
    }

    /// Handle one source signal, logging the result.
    pub async fn handle_signal(&self, signal: SourceSignal) {
        match signal {
            SourceSignal::Opened => tracing::warn!("Event stream opened"),
            SourceSignal::Closed => tracing::warn!("Event stream closed"),
            SourceSignal::Error(message) => tracing::error!(error = %message, "Event stream error"),
            SourceSignal::Message(payload) => {
                let span = tracing::info_span!("event", event_id = %Uuid::new_v4());
                self.handle_message(&payload).instrument(span).await;
            }
        }
    }

    async fn handle_message(&self, payload: &str) {
        match self.dispatch(payload).await {
            Ok(DispatchOutcome::Ignored) => {}
            Ok(DispatchOutcome::Skipped(reason)) => {
                tracing::debug!(reason = %reason, "Event skipped");
            }
            Ok(DispatchOutcome::Reconciled(report)) => {
                tracing::info!(
                    transition = %report.transition,
                    service = %report.service,
                    backend = %report.backend,
                    steps = report.steps.len(),
                    "Event reconciled"
                );
            }
            Err(e) => {
                metrics::record_dispatch_failure(e.kind());
                match &e {
                    DispatchError::Decode(_) => {
                        tracing::warn!(error = %e, len = payload.len(), "Discarding event")
                    }
                    DispatchError::Reconcile(failed) => tracing::error!(
                        error = %e,
                        completed = failed.completed.len(),
                        "Event abandoned mid-sequence"
                    ),
                    _ => tracing::error!(error = %e, "Event failed"),
                }
            }
        }
    }

    /// Consume signals until the channel closes or shutdown fires.
    pub async fn run(self, mut rx: mpsc::Receiver<SourceSignal>, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                signal = rx.recv() => match signal {
                    Some(signal) => self.handle_signal(signal).await,
                    None => {
                        tracing::info!("Event channel closed, dispatcher stopping");
                        return;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Dispatcher received shutdown signal");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MiddlewareConfig, RoutingConfig};
    use crate::facts::{ContainerDescriptor, FactExtractor};
    use crate::orchestration::StaticFetcher;
    use crate::reconcile::{Step, StepOutcome};
    use crate::store::{ConfigStore, MemoryStore};

    const URI: &str = "/api/app/v1/container/c1/";

    fn event(action: &str, state: &str) -> String {
        serde_json::json!({
            "type": "container",
            "action": action,
            "state": state,
            "resource_uri": URI,
        })
        .to_string()
    }

    fn dispatcher(store: Arc<MemoryStore>, fetcher: StaticFetcher) -> Dispatcher {
        let reconciler = Reconciler::new(
            ConfigStore::new(store, Duration::from_secs(1)),
            FactExtractor::new(RoutingConfig::default()),
            MiddlewareConfig::default(),
        );
        Dispatcher::new(reconciler, Arc::new(fetcher), Duration::from_secs(5))
    }

    fn web() -> ContainerDescriptor {
        ContainerDescriptor::new("web-1")
            .with_env("ROUTE", "/api")
            .with_env("PORT", "8080")
            .with_resource_uri(URI)
    }

    #[tokio::test]
    async fn test_running_then_stopped() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = StaticFetcher::new().with(web()).unwrap();
        let dispatcher = dispatcher(store.clone(), fetcher);

        let added = dispatcher.dispatch(&event("update", "Running")).await.unwrap();
        let DispatchOutcome::Reconciled(report) = added else {
            panic!("expected reconcile, got {added:?}");
        };
        assert_eq!(report.outcome(Step::Backend), Some(StepOutcome::Created));
        assert!(store.contains("/vulcand/backends/web/servers/web-1"));

        let removed = dispatcher.dispatch(&event("update", "Stopped")).await.unwrap();
        assert!(matches!(removed, DispatchOutcome::Reconciled(_)));
        assert!(!store.contains("/vulcand/backends/web/servers/web-1"));
        assert!(store.contains("/vulcand/backends/web/backend"));
    }

    #[tokio::test]
    async fn test_unclassified_event_ignored_without_fetch() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = dispatcher(store.clone(), StaticFetcher::new());

        let outcome = dispatcher.dispatch(&event("update", "Starting")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_decode_error() {
        let dispatcher = dispatcher(Arc::new(MemoryStore::new()), StaticFetcher::new());

        let err = dispatcher.dispatch("{not json").await.unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[tokio::test]
    async fn test_missing_resource_uri() {
        let dispatcher = dispatcher(Arc::new(MemoryStore::new()), StaticFetcher::new());
        let payload = r#"{"type":"container","action":"update","state":"Running"}"#;

        let err = dispatcher.dispatch(payload).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::MissingResourceUri { transition: Transition::Add }
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = dispatcher(store.clone(), StaticFetcher::new());

        let err = dispatcher.dispatch(&event("update", "Running")).await.unwrap_err();
        assert_eq!(err.kind(), "fetch");
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_run_drains_channel_until_closed() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = StaticFetcher::new().with(web()).unwrap();
        let dispatcher = dispatcher(store.clone(), fetcher);
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tx.send(SourceSignal::Opened).await.unwrap();
        tx.send(SourceSignal::Message("garbage".into())).await.unwrap();
        tx.send(SourceSignal::Message(event("update", "Running"))).await.unwrap();
        tx.send(SourceSignal::Error("reset".into())).await.unwrap();
        tx.send(SourceSignal::Closed).await.unwrap();
        drop(tx);

        dispatcher.run(rx, shutdown_rx).await;
        assert!(store.contains("/vulcand/frontends/web/frontend"));
    }
}
