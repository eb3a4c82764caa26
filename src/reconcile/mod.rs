//! Reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! (Transition, ContainerDescriptor)
//!     → facts (RouteFacts or skip)
//!     → reconciler.rs (ordered idempotent steps)
//!     → store::ConfigStore
//!     → ReconcileReport | ReconcileError (step + completed steps)
//! ```
//!
//! # Known Gap
//! Events carry no sequence number. A stale "running" event processed after
//! a newer "stopped" one re-creates the server record; nothing here detects
//! it.

pub mod reconciler;
pub mod types;

pub use reconciler::Reconciler;
pub use types::{
    ReconcileError, ReconcileOutcome, ReconcileReport, Step, StepOutcome, StepReport, Transition,
};
