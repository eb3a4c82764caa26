//! Configuration store subsystem.
//!
//! # Data Flow
//! ```text
//! Reconciler
//!     → idempotent.rs (create_if_absent / write / delete_if_present, deadlines)
//!     → cache.rs (optional known-keys shortcut)
//!     → client.rs (KvStore trait)
//!         → etcd.rs (etcd v2 keys API over HTTP)
//!         → memory.rs (in-process, dry runs and tests)
//! ```
//!
//! # Design Decisions
//! - Missing keys are values (`None` / `false`), not errors
//! - No multi-key transactions: every step is its own atomic unit
//! - Key and record layout lives in keys.rs only

pub mod cache;
pub mod client;
pub mod etcd;
pub mod idempotent;
pub mod keys;
pub mod memory;
pub mod types;

pub use client::KvStore;
pub use etcd::EtcdClient;
pub use idempotent::ConfigStore;
pub use memory::{MemoryStore, StoreOp};
pub use types::{CreateOutcome, DeleteOutcome, StoreError, StoreResult};
