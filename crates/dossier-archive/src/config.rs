//! Pipeline configuration.
//!
//! All directory roots and tuning knobs are explicit values handed to each
//! component at construction; nothing reads ambient/global state.

use crate::kind::RecordKind;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BATCH_SIZE: usize = 25;
pub const DEFAULT_CHUNK_SIZE: usize = 16;
pub const DEFAULT_RETENTION_DAYS: u32 = 365;
pub const DEFAULT_ACTOR: &str = "archive-job";

/// Retention threshold per record kind, in days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    pub enrollment_days: u32,
    pub defense_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            enrollment_days: DEFAULT_RETENTION_DAYS,
            defense_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl RetentionPolicy {
    pub fn days(&self, kind: RecordKind) -> u32 {
        match kind {
            RecordKind::Enrollment => self.enrollment_days,
            RecordKind::Defense => self.defense_days,
        }
    }
}

/// Configuration for one archival pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Base directory for source documents.
    pub uploads_root: PathBuf,
    /// Base directory for persisted bundles.
    pub archive_root: PathBuf,
    /// Server-side fetch size for the candidate selector.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Number of packaged bundles handed to the committer at a time.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub retention: RetentionPolicy,
    /// Recorded as `archived_by` on archive and audit rows.
    #[serde(default = "default_actor")]
    pub actor: String,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_actor() -> String {
    DEFAULT_ACTOR.to_string()
}

impl ArchiveConfig {
    pub fn new(uploads_root: impl Into<PathBuf>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            uploads_root: uploads_root.into(),
            archive_root: archive_root.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retention: RetentionPolicy::default(),
            actor: DEFAULT_ACTOR.to_string(),
        }
    }

    /// Records whose threshold date is strictly older than this instant are
    /// archive-eligible.
    pub fn cutoff(&self, kind: RecordKind, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.retention.days(kind)))
    }
}
