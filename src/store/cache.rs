//! Best-effort cache of keys known to exist.
//!
//! The store stays the source of truth: entries expire after a TTL and are
//! dropped whenever the store reports the key missing or the key is deleted.

use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug)]
pub struct KnownKeys {
    entries: DashMap<String, Instant>,
    ttl: Duration,
}

impl KnownKeys {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// True if `key` was seen present less than one TTL ago.
    pub fn contains(&self, key: &str) -> bool {
        let fresh = self.entries.get(key).map(|seen| seen.elapsed() < self.ttl);
        match fresh {
            Some(true) => true,
            Some(false) => {
                self.entries
                    .remove_if(key, |_, seen| seen.elapsed() >= self.ttl);
                false
            }
            None => false,
        }
    }

    pub fn insert(&self, key: &str) {
        self.entries.insert(key.to_string(), Instant::now());
    }

    pub fn invalidate(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            tracing::debug!(key = %key, "Known key invalidated");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
