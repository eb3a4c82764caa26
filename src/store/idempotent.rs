//! Idempotent write protocol on top of a [`KvStore`].
//!
//! # Responsibilities
//! - Bound every store call with a deadline
//! - `create_if_absent`: read, then write only when the key is missing
//! - `delete_if_present`: delete, treating a missing key as success
//! - Count every operation by outcome
//!
//! # Design Decisions
//! - `create_if_absent` is not atomic against a concurrent writer. Every
//!   writer of a given backend/frontend/middleware/listener key writes the
//!   same value, so the race is benign.
//! - Existing values are never compared or overwritten.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::observability::metrics;
use crate::store::cache::KnownKeys;
use crate::store::client::KvStore;
use crate::store::types::{CreateOutcome, DeleteOutcome, StoreError, StoreResult};

/// Store handle shared by the reconciler and the CLI.
#[derive(Clone)]
pub struct ConfigStore {
    backend: Arc<dyn KvStore>,
    timeout: Duration,
    known: Option<Arc<KnownKeys>>,
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn KvStore>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            known: None,
        }
    }

    /// Build from the `[store]` config section.
    pub fn from_config(backend: Arc<dyn KvStore>, config: &StoreConfig) -> Self {
        let store = Self::new(backend, Duration::from_secs(config.timeout_secs));
        if config.known_keys_cache {
            store.with_known_keys(Duration::from_secs(config.known_keys_ttl_secs))
        } else {
            store
        }
    }

    /// Enable the known-keys cache for `create_if_absent`.
    pub fn with_known_keys(mut self, ttl: Duration) -> Self {
        self.known = Some(Arc::new(KnownKeys::new(ttl)));
        self
    }

    pub fn known_keys(&self) -> Option<&KnownKeys> {
        self.known.as_deref()
    }

    pub async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let result = self.bounded("read", key, self.backend.read(key)).await;
        match &result {
            Ok(Some(_)) => metrics::record_store_op("read", "found"),
            Ok(None) => {
                self.forget(key);
                metrics::record_store_op("read", "not_found");
            }
            Err(_) => metrics::record_store_op("read", "error"),
        }
        result
    }

    /// Unconditional upsert.
    pub async fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        let result = self.bounded("write", key, self.backend.write(key, value)).await;
        metrics::record_store_op("write", if result.is_ok() { "ok" } else { "error" });
        result
    }

    /// Delete a key; `false` if it did not exist.
    pub async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.forget(key);
        let result = self.bounded("delete", key, self.backend.delete(key)).await;
        match &result {
            Ok(true) => metrics::record_store_op("delete", "deleted"),
            Ok(false) => metrics::record_store_op("delete", "not_found"),
            Err(_) => metrics::record_store_op("delete", "error"),
        }
        result
    }

    pub async fn list(&self, prefix: &str) -> StoreResult<Vec<(String, String)>> {
        self.bounded("list", prefix, self.backend.list(prefix)).await
    }

    /// Write `value` under `key` unless the key already exists.
    pub async fn create_if_absent(&self, key: &str, value: &str) -> StoreResult<CreateOutcome> {
        if let Some(known) = &self.known {
            if known.contains(key) {
                tracing::trace!(key = %key, "Known key, skipping read");
                return Ok(CreateOutcome::AlreadyExists);
            }
        }

        let outcome = match self.read(key).await? {
            Some(_) => CreateOutcome::AlreadyExists,
            None => {
                self.write(key, value).await?;
                CreateOutcome::Created
            }
        };

        if let Some(known) = &self.known {
            known.insert(key);
        }
        Ok(outcome)
    }

    /// Delete `key`, treating absence as the goal already met.
    pub async fn delete_if_present(&self, key: &str) -> StoreResult<DeleteOutcome> {
        if self.delete(key).await? {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyAbsent)
        }
    }

    fn forget(&self, key: &str) {
        if let Some(known) = &self.known {
            known.invalidate(key);
        }
    }

    async fn bounded<T, F>(&self, op: &'static str, key: &str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                op,
                key: key.to_string(),
                after: self.timeout,
            }),
        }
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("timeout", &self.timeout)
            .field("known_keys", &self.known.is_some())
            .finish()
    }
}
