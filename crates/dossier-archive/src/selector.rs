//! Candidate selection: a lazy, ordered, restartable stream of
//! archive-eligible records.
//!
//! Rows are fetched in bounded server-side pages (keyset pagination on the
//! id), never materialized as a whole. The selector performs no mutation; a
//! query failure ends the stream with an error and is fatal to the run.

use crate::config::ArchiveConfig;
use crate::error::SelectionError;
use crate::kind::RecordKind;
use crate::model::ArchiveCandidate;
use crate::store::Db;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::debug;

pub struct CandidateSelector {
    db: Db,
    kind: RecordKind,
    cutoff: DateTime<Utc>,
    batch_size: usize,
    last_id: i64,
    buffer: VecDeque<ArchiveCandidate>,
    exhausted: bool,
    failed: bool,
}

impl CandidateSelector {
    pub fn new(db: Db, kind: RecordKind, config: &ArchiveConfig, now: DateTime<Utc>) -> Self {
        Self::with_cutoff(db, kind, config.cutoff(kind, now), config.batch_size)
    }

    pub fn with_cutoff(db: Db, kind: RecordKind, cutoff: DateTime<Utc>, batch_size: usize) -> Self {
        Self {
            db,
            kind,
            cutoff,
            batch_size: batch_size.max(1),
            last_id: 0,
            buffer: VecDeque::new(),
            exhausted: false,
            failed: false,
        }
    }

    /// Resume iteration strictly after the given id (restartability).
    pub fn starting_after(mut self, last_id: i64) -> Self {
        self.last_id = last_id;
        self
    }

    fn refill(&mut self) -> Result<(), SelectionError> {
        let page =
            self.db
                .fetch_candidates_page(self.kind, self.cutoff, self.last_id, self.batch_size)?;
        debug!(
            kind = %self.kind,
            after = self.last_id,
            fetched = page.len(),
            "selector page"
        );
        if page.len() < self.batch_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.last_id = last.id();
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for CandidateSelector {
    type Item = Result<ArchiveCandidate, SelectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.refill() {
                self.failed = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
