//! The reconciliation core.
//!
//! # Responsibilities
//! - ADD: backend → server → frontend → rate-limit → https-redirect
//! - REMOVE: delete the container's server record only
//! - Startup: create configured listeners
//!
//! # Design Decisions
//! - Stateless between events: presence checks go to the store
//! - Missing route/port aborts ADD before the first write
//! - No internal retries; a failed step abandons the rest of the sequence
//! - Shared records (backend, frontend, middlewares) are never removed since
//!   there is no way to tell when the last server of a backend leaves

use serde::Serialize;

use crate::config::{ListenerConfig, MiddlewareConfig, SyncConfig};
use crate::facts::{ContainerDescriptor, FactExtractor};
use crate::reconcile::types::{
    ReconcileError, ReconcileOutcome, ReconcileReport, Step, StepOutcome, StepReport, Transition,
};
use crate::store::keys::{self, BackendRecord, FrontendRecord, ListenerRecord, MiddlewareKind, ServerRecord};
use crate::store::{ConfigStore, StoreResult};

/// Applies lifecycle transitions to the configuration store.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: ConfigStore,
    extractor: FactExtractor,
    middleware: MiddlewareConfig,
}

impl Reconciler {
    pub fn new(store: ConfigStore, extractor: FactExtractor, middleware: MiddlewareConfig) -> Self {
        Self {
            store,
            extractor,
            middleware,
        }
    }

    pub fn from_config(store: ConfigStore, config: &SyncConfig) -> Self {
        Self::new(
            store,
            FactExtractor::new(config.routing.clone()),
            config.middleware.clone(),
        )
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Apply one classified transition for `descriptor`.
    pub async fn apply(
        &self,
        transition: Transition,
        descriptor: &ContainerDescriptor,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match transition {
            Transition::Add => self.add(descriptor).await,
            Transition::Remove => self.remove(descriptor).await,
        }
    }

    /// Publish a running container.
    pub async fn add(&self, descriptor: &ContainerDescriptor) -> Result<ReconcileOutcome, ReconcileError> {
        let facts = match self.extractor.extract(descriptor) {
            Ok(facts) => facts,
            Err(reason) => {
                tracing::warn!(container = %descriptor.name, reason = %reason, "Skipping container");
                return Ok(ReconcileOutcome::Skipped(reason));
            }
        };
        let backend = facts.backend_name.as_str();
        let service = facts.service_name.as_str();

        let mut seq = Sequence::new(&self.store, service);
        seq.ensure(Step::Backend, keys::backend_key(backend), &BackendRecord::http())
            .await?;
        // Servers are overwritten so a restarted slot can change its target.
        seq.upsert(
            Step::Server,
            keys::server_key(backend, service),
            &ServerRecord::new(&facts.target_host, &facts.target_port),
        )
        .await?;
        seq.ensure(
            Step::Frontend,
            keys::frontend_key(backend),
            &FrontendRecord::path_prefix(backend, &facts.route_pattern),
        )
        .await?;
        if self.middleware.rate_limit_enabled {
            seq.ensure(
                Step::RateLimit,
                keys::middleware_key(backend, MiddlewareKind::RateLimit),
                &keys::rate_limit_record(&self.middleware),
            )
            .await?;
        }
        if self.middleware.https_redirect_enabled {
            seq.ensure(
                Step::HttpsRedirect,
                keys::middleware_key(backend, MiddlewareKind::HttpsRedirect),
                &keys::https_redirect_record(),
            )
            .await?;
        }

        tracing::info!(
            container = %service,
            backend = %backend,
            url = %facts.target_url(),
            route = %facts.route_pattern,
            "Container routed"
        );
        Ok(ReconcileOutcome::Applied(seq.into_report(Transition::Add, backend)))
    }

    /// Withdraw a stopped or terminated container.
    pub async fn remove(&self, descriptor: &ContainerDescriptor) -> Result<ReconcileOutcome, ReconcileError> {
        let service = descriptor.name.as_str();
        let backend = self.extractor.backend_name(service);

        let mut seq = Sequence::new(&self.store, service);
        seq.remove(Step::Server, keys::server_key(backend, service)).await?;

        Ok(ReconcileOutcome::Applied(seq.into_report(Transition::Remove, backend)))
    }

    /// Create every listener that does not exist yet.
    pub async fn ensure_listeners(
        &self,
        listeners: &[ListenerConfig],
    ) -> Result<Vec<StepReport>, ReconcileError> {
        let mut seq = Sequence::new(&self.store, "listeners");
        for listener in listeners {
            seq.ensure(
                Step::Listener,
                keys::listener_key(&listener.name),
                &ListenerRecord::from(listener),
            )
            .await?;
        }
        Ok(seq.steps)
    }
}

/// Ordered steps of one transition.
struct Sequence<'a> {
    store: &'a ConfigStore,
    service: &'a str,
    steps: Vec<StepReport>,
}

impl<'a> Sequence<'a> {
    fn new(store: &'a ConfigStore, service: &'a str) -> Self {
        Self {
            store,
            service,
            steps: Vec::new(),
        }
    }

    async fn ensure<T: Serialize>(&mut self, step: Step, key: String, record: &T) -> Result<(), ReconcileError> {
        let result = match keys::encode(&key, record) {
            Ok(value) => self.store.create_if_absent(&key, &value).await.map(StepOutcome::from),
            Err(e) => Err(e),
        };
        self.finish(step, key, result)
    }

    async fn upsert<T: Serialize>(&mut self, step: Step, key: String, record: &T) -> Result<(), ReconcileError> {
        let result = match keys::encode(&key, record) {
            Ok(value) => self.store.write(&key, &value).await.map(|()| StepOutcome::Written),
            Err(e) => Err(e),
        };
        self.finish(step, key, result)
    }

    async fn remove(&mut self, step: Step, key: String) -> Result<(), ReconcileError> {
        let result = self.store.delete_if_present(&key).await.map(StepOutcome::from);
        self.finish(step, key, result)
    }

    fn finish(&mut self, step: Step, key: String, result: StoreResult<StepOutcome>) -> Result<(), ReconcileError> {
        match result {
            Ok(outcome) => {
                tracing::info!(
                    container = %self.service,
                    step = %step,
                    key = %key,
                    outcome = %outcome,
                    "Reconcile step"
                );
                self.steps.push(StepReport { step, key, outcome });
                Ok(())
            }
            Err(source) => {
                tracing::warn!(
                    container = %self.service,
                    step = %step,
                    key = %key,
                    error = %source,
                    "Reconcile step failed"
                );
                Err(ReconcileError {
                    step,
                    key,
                    completed: std::mem::take(&mut self.steps),
                    source,
                })
            }
        }
    }

    fn into_report(self, transition: Transition, backend: &str) -> ReconcileReport {
        ReconcileReport {
            transition,
            service: self.service.to_string(),
            backend: backend.to_string(),
            steps: self.steps,
        }
    }
}
