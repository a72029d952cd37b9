//! Run orchestration: Selector → Packager → Committer in bounded chunks.
//!
//! One run is a single sequential flow. Packaging and commit failures are
//! recovered locally (logged, counted); only selection errors abort the run.
//! Cancellation is honored between chunks — an in-flight chunk always
//! completes, never aborts mid-bundle.

use crate::committer::{Committer, CommitStatus};
use crate::config::ArchiveConfig;
use crate::crypto::EncryptionProvider;
use crate::error::SelectionError;
use crate::kind::RecordKind;
use crate::model::ArchiveBundle;
use crate::packager::Packager;
use crate::selector::CandidateSelector;
use crate::store::Db;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Cooperative stop signal, checked between chunks only.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Stage at which an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Packaging,
    Commit,
}

/// One per-item error reason, surfaced in the run summary.
#[derive(Debug)]
pub struct ItemFailure {
    pub kind: RecordKind,
    pub id: i64,
    pub stage: FailureStage,
    pub reason: String,
}

/// Per-run counts and failure reasons reported upward. No per-item failure
/// escapes as an error.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub selected: u64,
    pub packaged: u64,
    pub committed: u64,
    pub partial: u64,
    pub failed: u64,
    pub files_purged: u64,
    pub purge_failures: u64,
    pub failures: Vec<ItemFailure>,
    pub cancelled: bool,
}

impl RunSummary {
    /// Items fully or partially archived (partial = purge incomplete,
    /// otherwise committed).
    pub fn archived(&self) -> u64 {
        self.committed + self.partial
    }
}

/// One archival pipeline instance over a database, an uploads tree and an
/// archive tree.
pub struct ArchiveJob {
    db: Db,
    config: ArchiveConfig,
    packager: Packager,
    committer: Committer,
}

impl ArchiveJob {
    pub fn new(db: Db, config: ArchiveConfig, crypto: Arc<dyn EncryptionProvider>) -> Self {
        let packager = Packager::new(&config, crypto);
        let committer = Committer::new(db.clone());
        Self {
            db,
            config,
            packager,
            committer,
        }
    }

    /// Archive every eligible record of one kind. Returns the summary, or the
    /// fatal selection error that aborted the run.
    pub fn run(
        &self,
        kind: RecordKind,
        cancel: &CancelToken,
    ) -> Result<RunSummary, SelectionError> {
        let cutoff = self.config.cutoff(kind, Utc::now());
        info!(
            kind = %kind,
            cutoff = %cutoff,
            batch_size = self.config.batch_size,
            chunk_size = self.config.chunk_size,
            "archival run started"
        );

        let selector = CandidateSelector::new(self.db.clone(), kind, &self.config, Utc::now());
        let mut summary = RunSummary::default();
        let mut chunk: Vec<ArchiveBundle> = Vec::with_capacity(self.config.chunk_size);

        for candidate in selector {
            let candidate = candidate?;
            summary.selected += 1;

            match self.packager.package(&candidate) {
                Ok(bundle) => {
                    summary.packaged += 1;
                    chunk.push(bundle);
                }
                Err(e) => {
                    warn!(kind = %kind, id = candidate.id(), error = %e, "packaging failed, item skipped");
                    summary.failed += 1;
                    summary.failures.push(ItemFailure {
                        kind,
                        id: candidate.id(),
                        stage: FailureStage::Packaging,
                        reason: e.to_string(),
                    });
                }
            }

            if chunk.len() >= self.config.chunk_size {
                self.flush_chunk(&mut chunk, &mut summary);
                if cancel.is_cancelled() {
                    summary.cancelled = true;
                    info!(kind = %kind, "run cancelled between chunks");
                    break;
                }
            }
        }

        if !summary.cancelled {
            self.flush_chunk(&mut chunk, &mut summary);
        }

        info!(
            kind = %kind,
            selected = summary.selected,
            packaged = summary.packaged,
            committed = summary.committed,
            partial = summary.partial,
            failed = summary.failed,
            files_purged = summary.files_purged,
            purge_failures = summary.purge_failures,
            cancelled = summary.cancelled,
            "archival run finished"
        );
        Ok(summary)
    }

    fn flush_chunk(&self, chunk: &mut Vec<ArchiveBundle>, summary: &mut RunSummary) {
        if chunk.is_empty() {
            return;
        }
        for outcome in self.committer.commit_chunk(chunk) {
            summary.files_purged += outcome.files_purged as u64;
            summary.purge_failures += outcome.purge_failures as u64;
            match outcome.status {
                CommitStatus::Committed => summary.committed += 1,
                CommitStatus::Partial => summary.partial += 1,
                CommitStatus::Aborted => {
                    summary.failed += 1;
                    summary.failures.push(ItemFailure {
                        kind: outcome.kind,
                        id: outcome.id,
                        stage: FailureStage::Commit,
                        reason: outcome
                            .error
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "unknown commit failure".to_string()),
                    });
                }
            }
        }
        chunk.clear();
    }
}
