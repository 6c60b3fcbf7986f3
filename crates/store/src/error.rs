//! Store and engine error model.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use restock_calendar::CalendarError;
use restock_core::DomainError;

/// Failure in the persistence or concurrency layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The durable file exists but cannot be understood. Kept apart
    /// from plain IO errors: this one needs a human (or a backup), not
    /// a retry.
    #[error("durable state at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writer lock not acquired within the deadline. The operation had
    /// zero effect and is safe to retry. `held` is how long the current
    /// holder has been in there: milliseconds point at brief
    /// contention, minutes at a stuck writer.
    #[error(
        "writer lock not acquired within {waited:?}; current holder has held it for {held:?}"
    )]
    LockTimeout { waited: Duration, held: Duration },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Any failure an engine operation can surface, by layer.
///
/// A resubmitted document is not in here: that is a defined outcome
/// (`ReceiptOutcome::AlreadyProcessed`), not an error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
