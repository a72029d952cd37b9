//! Data model: live source rows, immutable snapshots, the transient bundle
//! and the persisted archive/audit rows.

use crate::kind::RecordKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Live enrollment row as read from the source store.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRow {
    pub id: i64,
    pub student_name: String,
    pub program: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    pub archived: bool,
}

/// Live defense row as read from the source store.
///
/// Defenses carry explicit stored document paths (relative to the uploads
/// root) in addition to the per-entity upload directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DefenseRow {
    pub id: i64,
    pub student_name: String,
    pub thesis_title: String,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
    pub defended_at: Option<DateTime<Utc>>,
    pub report_path: Option<String>,
    pub slides_path: Option<String>,
    pub archived: bool,
}

/// A source record currently eligible for archiving.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveCandidate {
    Enrollment(EnrollmentRow),
    Defense(DefenseRow),
}

impl ArchiveCandidate {
    pub fn id(&self) -> i64 {
        match self {
            ArchiveCandidate::Enrollment(r) => r.id,
            ArchiveCandidate::Defense(r) => r.id,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            ArchiveCandidate::Enrollment(_) => RecordKind::Enrollment,
            ArchiveCandidate::Defense(_) => RecordKind::Defense,
        }
    }

    /// Copy the archivable fields into an immutable snapshot. The source row
    /// is not read again after this point.
    pub fn snapshot(&self) -> Snapshot {
        match self {
            ArchiveCandidate::Enrollment(r) => Snapshot::Enrollment(EnrollmentSnapshot {
                id: r.id,
                student_name: r.student_name.clone(),
                program: r.program.clone(),
                status: r.status.clone(),
                submitted_at: r.submitted_at,
                validated_at: r.validated_at,
            }),
            ArchiveCandidate::Defense(r) => Snapshot::Defense(DefenseSnapshot {
                id: r.id,
                student_name: r.student_name.clone(),
                thesis_title: r.thesis_title.clone(),
                status: r.status.clone(),
                scheduled_at: r.scheduled_at,
                defended_at: r.defended_at,
                report_path: r.report_path.clone(),
                slides_path: r.slides_path.clone(),
            }),
        }
    }
}

/// Immutable copy of an enrollment's archivable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentSnapshot {
    pub id: i64,
    pub student_name: String,
    pub program: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

/// Immutable copy of a defense's archivable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefenseSnapshot {
    pub id: i64,
    pub student_name: String,
    pub thesis_title: String,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
    pub defended_at: Option<DateTime<Utc>>,
    pub report_path: Option<String>,
    pub slides_path: Option<String>,
}

/// Snapshot of a candidate at archival time, written as `snapshot.json` into
/// the bundle and as a JSON column in the archive row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Snapshot {
    Enrollment(EnrollmentSnapshot),
    Defense(DefenseSnapshot),
}

impl Snapshot {
    pub fn id(&self) -> i64 {
        match self {
            Snapshot::Enrollment(s) => s.id,
            Snapshot::Defense(s) => s.id,
        }
    }
}

/// Transient, in-memory package for one candidate. Created by the packager,
/// consumed and discarded by the committer; never persisted as such.
#[derive(Debug, Clone)]
pub struct ArchiveBundle {
    pub kind: RecordKind,
    pub original_id: i64,
    pub snapshot: Snapshot,
    /// Snapshot serialized once at packaging time; the committer stores this
    /// string verbatim so the archive row matches the bundled `snapshot.json`.
    pub snapshot_json: String,
    pub encrypted_payload: Vec<u8>,
    pub target_location: PathBuf,
    /// Resolved original document paths, ordered and deduplicated.
    pub original_file_paths: Vec<PathBuf>,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    /// Sum of original file byte lengths (metrics only).
    pub uncompressed_size: u64,
    /// Length of the encrypted payload (metrics only).
    pub compressed_size: u64,
    /// Hex sha-256 of the encrypted payload, recorded in the audit trail.
    pub payload_sha256: String,
}

impl ArchiveBundle {
    pub(crate) fn archive_record(&self) -> ArchiveRecord {
        ArchiveRecord {
            id: self.original_id,
            kind: self.kind,
            snapshot_json: self.snapshot_json.clone(),
            archived_at: self.timestamp,
            archived_by: self.actor.clone(),
            archive_location: self.target_location.to_string_lossy().into_owned(),
        }
    }

    pub(crate) fn audit_entry(&self) -> AuditTrailEntry {
        AuditTrailEntry {
            entity_type: self.kind,
            entity_id: self.original_id,
            archive_location: self.target_location.to_string_lossy().into_owned(),
            archived_by: self.actor.clone(),
            archived_at: self.timestamp,
            uncompressed_size: self.uncompressed_size,
            compressed_size: self.compressed_size,
            payload_sha256: self.payload_sha256.clone(),
        }
    }
}

/// Permanent snapshot row, keyed by the original candidate id (1:1, never
/// reused). Exists iff the candidate's flag is set and a bundle exists at
/// `archive_location`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveRecord {
    pub id: i64,
    pub kind: RecordKind,
    pub snapshot_json: String,
    pub archived_at: DateTime<Utc>,
    pub archived_by: String,
    pub archive_location: String,
}

/// Append-only, immutable log row describing one completed archival.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditTrailEntry {
    pub entity_type: RecordKind,
    pub entity_id: i64,
    pub archive_location: String,
    pub archived_by: String,
    pub archived_at: DateTime<Utc>,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub payload_sha256: String,
}
