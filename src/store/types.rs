//! Store error and outcome types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by store operations.
///
/// A missing key is not an error: reads return `None` and deletes return
/// `false`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection or request failed before a response was received.
    #[error("store request failed: {0}")]
    Transport(String),

    /// The store answered with an unexpected status.
    #[error("store returned status {status} for {key}: {message}")]
    Status {
        key: String,
        status: u16,
        message: String,
    },

    /// The store response body could not be decoded.
    #[error("invalid store response for {key}: {reason}")]
    Decode { key: String, reason: String },

    /// A record could not be encoded to JSON.
    #[error("failed to encode record for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The operation did not complete within the configured deadline.
    #[error("store {op} on {key} timed out after {after:?}")]
    Timeout {
        op: &'static str,
        key: String,
        after: Duration,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of an idempotent-by-presence create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Outcome of an idempotent delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

impl fmt::Display for CreateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateOutcome::Created => f.write_str("created"),
            CreateOutcome::AlreadyExists => f.write_str("already-exists"),
        }
    }
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteOutcome::Deleted => f.write_str("deleted"),
            DeleteOutcome::AlreadyAbsent => f.write_str("already-absent"),
        }
    }
}
