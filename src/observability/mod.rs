//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! events, reconcile, store
//!     → logging.rs (tracing subscriber, one span per event with event_id)
//!     → metrics.rs (counters, Prometheus scrape endpoint when enabled)
//! ```

pub mod logging;
pub mod metrics;
