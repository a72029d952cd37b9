//! Commit: durably persist a bundle and its bookkeeping, then retire the
//! source record.
//!
//! Per bundle, in order: archive record insert, bundle file write, audit
//! insert, conditional flag update. The three relational steps share one
//! `BEGIN IMMEDIATE` transaction per bundle (never per chunk); the file write
//! sits outside it and can be left behind as an orphan when the transaction
//! later rolls back. Purging originals is best-effort and runs only after a
//! successful commit.

use crate::error::CommitError;
use crate::kind::RecordKind;
use crate::model::ArchiveBundle;
use crate::store::{archive, source, Db};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Terminal state of one bundle after a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// Fully committed, all originals purged.
    Committed,
    /// Fully committed, one or more originals could not be purged.
    Partial,
    /// Relational steps failed and were rolled back; nothing archived.
    Aborted,
}

/// Per-item outcome reported upward; the committer never retries.
#[derive(Debug)]
pub struct CommitOutcome {
    pub kind: RecordKind,
    pub id: i64,
    pub status: CommitStatus,
    pub files_purged: usize,
    pub purge_failures: usize,
    pub error: Option<CommitError>,
}

pub struct Committer {
    db: Db,
}

impl Committer {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Commit a chunk of packaged bundles, sequentially and independently.
    /// One failing bundle never rolls back or blocks another.
    pub fn commit_chunk(&self, chunk: &[ArchiveBundle]) -> Vec<CommitOutcome> {
        chunk.iter().map(|bundle| self.commit_one(bundle)).collect()
    }

    fn commit_one(&self, bundle: &ArchiveBundle) -> CommitOutcome {
        match self.commit_durable(bundle) {
            Ok(()) => {
                let (files_purged, purge_failures) = purge_originals(bundle);
                let status = if purge_failures == 0 {
                    CommitStatus::Committed
                } else {
                    CommitStatus::Partial
                };
                info!(
                    kind = %bundle.kind,
                    id = bundle.original_id,
                    location = %bundle.target_location.display(),
                    files_purged,
                    purge_failures,
                    "archived candidate"
                );
                CommitOutcome {
                    kind: bundle.kind,
                    id: bundle.original_id,
                    status,
                    files_purged,
                    purge_failures,
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    kind = %bundle.kind,
                    id = bundle.original_id,
                    error = %e,
                    "commit failed, item skipped"
                );
                CommitOutcome {
                    kind: bundle.kind,
                    id: bundle.original_id,
                    status: CommitStatus::Aborted,
                    files_purged: 0,
                    purge_failures: 0,
                    error: Some(e),
                }
            }
        }
    }

    /// Steps 1-4. The archive record, audit entry and flag update commit or
    /// roll back together; the bundle file write does not participate in the
    /// transaction.
    fn commit_durable(&self, bundle: &ArchiveBundle) -> Result<(), CommitError> {
        let conn = self.db.conn();

        conn.execute("BEGIN IMMEDIATE", [])?;

        let mut bundle_written = false;
        let result = (|| -> Result<(), CommitError> {
            archive::insert_archive_record(&conn, &bundle.archive_record())?;

            write_bundle_file(&bundle.target_location, &bundle.encrypted_payload)?;
            bundle_written = true;

            archive::insert_audit_entry(&conn, &bundle.audit_entry())?;

            if !source::set_archived(&conn, bundle.kind, bundle.original_id)? {
                return Err(CommitError::CandidateGone {
                    kind: bundle.kind,
                    id: bundle.original_id,
                });
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                if let Err(e) = conn.execute("COMMIT", []) {
                    let _ = conn.execute("ROLLBACK", []);
                    log_orphan(bundle, bundle_written);
                    return Err(e.into());
                }
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                log_orphan(bundle, bundle_written);
                Err(e)
            }
        }
    }
}

fn log_orphan(bundle: &ArchiveBundle, bundle_written: bool) {
    // Known gap: the filesystem write is not covered by the relational
    // rollback, so the bundle file stays behind.
    if bundle_written {
        warn!(
            kind = %bundle.kind,
            id = bundle.original_id,
            location = %bundle.target_location.display(),
            "transaction rolled back after bundle write; orphaned bundle left on disk"
        );
    }
}

/// Idempotent create-or-overwrite of the bundle file, fsynced, parent
/// directories created as needed.
fn write_bundle_file(location: &Path, payload: &[u8]) -> Result<(), CommitError> {
    let io_err = |source: std::io::Error| CommitError::BundleWrite {
        location: location.to_path_buf(),
        source,
    };

    if let Some(parent) = location.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut file = fs::File::create(location).map_err(io_err)?;
    file.write_all(payload).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    Ok(())
}

/// Best-effort deletion of the original documents, each attempted
/// independently. A file already gone is not a failure.
fn purge_originals(bundle: &ArchiveBundle) -> (usize, usize) {
    let mut purged = 0;
    let mut failures = 0;
    for path in &bundle.original_file_paths {
        match fs::remove_file(path) {
            Ok(()) => purged += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "original already gone, nothing to purge");
            }
            Err(e) => {
                warn!(
                    kind = %bundle.kind,
                    id = bundle.original_id,
                    path = %path.display(),
                    error = %e,
                    "failed to purge original document"
                );
                failures += 1;
            }
        }
    }
    (purged, failures)
}
