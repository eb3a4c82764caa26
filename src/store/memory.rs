//! In-process store used for dry runs and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::store::client::KvStore;
use crate::store::types::{StoreError, StoreResult};

/// Store operation, used to target injected faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Read,
    Write,
    Delete,
    List,
}

#[derive(Debug, Clone)]
struct Fault {
    op: StoreOp,
    key_prefix: String,
}

/// A `BTreeMap`-backed [`KvStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    faults: Mutex<Vec<Fault>>,
    latency: Mutex<Option<Duration>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without counting it as a write.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        lock(&self.entries).insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        lock(&self.entries).clone()
    }

    /// Fail every `op` on keys starting with `key_prefix`.
    pub fn fail_on(&self, op: StoreOp, key_prefix: impl Into<String>) {
        lock(&self.faults).push(Fault {
            op,
            key_prefix: key_prefix.into(),
        });
    }

    pub fn clear_faults(&self) {
        lock(&self.faults).clear();
    }

    /// Delay every operation by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *lock(&self.latency) = latency;
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::Relaxed)
    }

    async fn enter(&self, op: StoreOp, key: &str) -> StoreResult<()> {
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let faulted = lock(&self.faults)
            .iter()
            .any(|f| f.op == op && key.starts_with(&f.key_prefix));
        if faulted {
            return Err(StoreError::Transport(format!(
                "injected {op:?} failure for {key}"
            )));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        self.enter(StoreOp::Read, key).await?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        self.enter(StoreOp::Write, key).await?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.enter(StoreOp::Delete, key).await?;
        self.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(lock(&self.entries).remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<(String, String)>> {
        self.enter(StoreOp::List, prefix).await?;
        Ok(lock(&self.entries)
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
