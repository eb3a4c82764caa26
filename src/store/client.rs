//! Key-value store abstraction.

use async_trait::async_trait;

use crate::store::types::StoreResult;

/// Primitive operations against a hierarchical key-value store.
///
/// Implementations only need per-key linearizability; nothing here spans
/// more than one key.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a leaf value. `None` when the key does not exist.
    async fn read(&self, key: &str) -> StoreResult<Option<String>>;

    /// Unconditional upsert.
    async fn write(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a key. Returns `false` when the key did not exist.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// All leaves below `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<(String, String)>>;
}
