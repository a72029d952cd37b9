//! Error taxonomy for the archival pipeline.
//!
//! Selection errors are fatal to a run; packaging and commit errors are
//! per-item and recovered locally by the run loop.

use crate::kind::RecordKind;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal query/connectivity failure while streaming candidates.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("source query failed: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for SelectionError {
    fn from(e: rusqlite::Error) -> Self {
        SelectionError::Database(e.to_string())
    }
}

/// Per-item failure while building a bundle. The item is skipped, the run
/// continues.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("snapshot serialization failed for {kind} {id}: {source}")]
    Snapshot {
        kind: RecordKind,
        id: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error("container build failed for {kind} {id}: {source}")]
    Container {
        kind: RecordKind,
        id: i64,
        #[source]
        source: std::io::Error,
    },

    #[error("encryption failed for {kind} {id}: {reason}")]
    Encryption {
        kind: RecordKind,
        id: i64,
        reason: String,
    },
}

/// Per-item failure while durably committing a bundle. The relational
/// transaction is rolled back; the run continues with the next bundle.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("database error: {0}")]
    Database(String),

    #[error("bundle write failed at {location}: {source}")]
    BundleWrite {
        location: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The conditional flag update matched no row: the candidate was archived
    /// by a concurrent run or deleted since selection.
    #[error("candidate {kind} {id} no longer eligible (flag already set or row gone)")]
    CandidateGone { kind: RecordKind, id: i64 },
}

impl From<rusqlite::Error> for CommitError {
    fn from(e: rusqlite::Error) -> Self {
        CommitError::Database(e.to_string())
    }
}
