//! Reconciliation transitions, reports and errors.

use std::fmt;

use thiserror::Error;

use crate::facts::FactError;
use crate::store::{CreateOutcome, DeleteOutcome, StoreError};

/// Classified container lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Container is running: publish its server and shared records.
    Add,
    /// Container stopped or terminated: withdraw its server.
    Remove,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Add => "add",
            Transition::Remove => "remove",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One store operation in a transition sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Backend,
    Server,
    Frontend,
    RateLimit,
    HttpsRedirect,
    Listener,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Backend => "backend",
            Step::Server => "server",
            Step::Frontend => "frontend",
            Step::RateLimit => "rate-limit",
            Step::HttpsRedirect => "https-redirect",
            Step::Listener => "listener",
        };
        f.pad(name)
    }
}

/// What a step did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Created,
    AlreadyExists,
    /// Unconditional upsert.
    Written,
    Deleted,
    AlreadyAbsent,
}

impl From<CreateOutcome> for StepOutcome {
    fn from(outcome: CreateOutcome) -> Self {
        match outcome {
            CreateOutcome::Created => StepOutcome::Created,
            CreateOutcome::AlreadyExists => StepOutcome::AlreadyExists,
        }
    }
}

impl From<DeleteOutcome> for StepOutcome {
    fn from(outcome: DeleteOutcome) -> Self {
        match outcome {
            DeleteOutcome::Deleted => StepOutcome::Deleted,
            DeleteOutcome::AlreadyAbsent => StepOutcome::AlreadyAbsent,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepOutcome::Created => "created",
            StepOutcome::AlreadyExists => "already-exists",
            StepOutcome::Written => "written",
            StepOutcome::Deleted => "deleted",
            StepOutcome::AlreadyAbsent => "already-absent",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    pub key: String,
    pub outcome: StepOutcome,
}

/// Every step applied for one transition, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub transition: Transition,
    pub service: String,
    pub backend: String,
    pub steps: Vec<StepReport>,
}

impl ReconcileReport {
    /// Outcome of `step`, if it ran.
    pub fn outcome(&self, step: Step) -> Option<StepOutcome> {
        self.steps.iter().find(|r| r.step == step).map(|r| r.outcome)
    }
}

/// Result of a transition that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied(ReconcileReport),
    /// Required facts were missing; nothing was written.
    Skipped(FactError),
}

/// A store failure that abandoned a transition mid-sequence.
///
/// Steps listed in `completed` stay applied.
#[derive(Debug, Error)]
#[error("{step} step failed for {key}: {source}")]
pub struct ReconcileError {
    pub step: Step,
    pub key: String,
    pub completed: Vec<StepReport>,
    #[source]
    pub source: StoreError,
}
