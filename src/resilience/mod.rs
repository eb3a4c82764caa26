//! Resilience subsystem.
//!
//! # Design Decisions
//! - Store calls carry a deadline (store::ConfigStore), events carry one
//!   more around fetch + reconcile (events::Dispatcher)
//! - Failed events are not retried; the next event for the same container
//!   converges the store
//! - Only the event stream connection is retried, with backoff.rs

pub mod backoff;

pub use backoff::ReconnectBackoff;
