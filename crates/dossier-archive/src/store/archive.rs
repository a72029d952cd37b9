//! Archive-side operations: record and audit inserts (transactional, used by
//! the committer) plus the read APIs behind the `audit` surface.

use super::{parse_ts, Db};
use crate::kind::RecordKind;
use crate::model::{ArchiveRecord, AuditTrailEntry};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::str::FromStr;

/// Insert the permanent archive row. Plain INSERT: the primary key equals the
/// original id, so a duplicate archival fails here instead of overwriting.
pub(crate) fn insert_archive_record(
    conn: &Connection,
    record: &ArchiveRecord,
) -> rusqlite::Result<()> {
    let sql = format!(
        "INSERT INTO {} (id, snapshot, archived_at, archived_by, archive_location)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        record.kind.archive_table()
    );
    conn.execute(
        &sql,
        params![
            record.id,
            record.snapshot_json,
            record.archived_at.to_rfc3339(),
            record.archived_by,
            record.archive_location,
        ],
    )?;
    Ok(())
}

/// Append one audit row. The UNIQUE (entity_type, entity_id) index guarantees
/// at most one entry per archived id.
pub(crate) fn insert_audit_entry(
    conn: &Connection,
    entry: &AuditTrailEntry,
) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO audit_trail (
            entity_type, entity_id, archive_location, archived_by, archived_at,
            uncompressed_size, compressed_size, payload_sha256
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            entry.entity_type.as_str(),
            entry.entity_id,
            entry.archive_location,
            entry.archived_by,
            entry.archived_at.to_rfc3339(),
            entry.uncompressed_size as i64,
            entry.compressed_size as i64,
            entry.payload_sha256,
        ],
    )?;
    Ok(())
}

impl Db {
    pub fn get_archive_record(
        &self,
        kind: RecordKind,
        id: i64,
    ) -> rusqlite::Result<Option<ArchiveRecord>> {
        let sql = format!(
            "SELECT id, snapshot, archived_at, archived_by, archive_location
             FROM {} WHERE id = ?1",
            kind.archive_table()
        );
        let conn = self.conn();
        conn.query_row(&sql, [id], |row| map_archive_record(row, kind))
            .optional()
    }

    pub fn get_audit_entry(
        &self,
        kind: RecordKind,
        id: i64,
    ) -> rusqlite::Result<Option<AuditTrailEntry>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT entity_type, entity_id, archive_location, archived_by, archived_at,
                    uncompressed_size, compressed_size, payload_sha256
             FROM audit_trail WHERE entity_type = ?1 AND entity_id = ?2",
            params![kind.as_str(), id],
            map_audit_entry,
        )
        .optional()
    }

    /// Audit entries, newest first, optionally filtered by kind.
    pub fn list_audit_entries(
        &self,
        kind: Option<RecordKind>,
    ) -> rusqlite::Result<Vec<AuditTrailEntry>> {
        let conn = self.conn();
        let base = "SELECT entity_type, entity_id, archive_location, archived_by, archived_at,
                           uncompressed_size, compressed_size, payload_sha256
                    FROM audit_trail";
        match kind {
            Some(k) => {
                let sql = format!("{base} WHERE entity_type = ?1 ORDER BY archived_at DESC, id DESC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([k.as_str()], map_audit_entry)?;
                rows.collect()
            }
            None => {
                let sql = format!("{base} ORDER BY archived_at DESC, id DESC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], map_audit_entry)?;
                rows.collect()
            }
        }
    }
}

fn map_archive_record(row: &Row<'_>, kind: RecordKind) -> rusqlite::Result<ArchiveRecord> {
    let archived_at: String = row.get(2)?;
    Ok(ArchiveRecord {
        id: row.get(0)?,
        kind,
        snapshot_json: row.get(1)?,
        archived_at: parse_ts(&archived_at)?,
        archived_by: row.get(3)?,
        archive_location: row.get(4)?,
    })
}

fn map_audit_entry(row: &Row<'_>) -> rusqlite::Result<AuditTrailEntry> {
    let entity_type: String = row.get(0)?;
    let archived_at: String = row.get(4)?;
    Ok(AuditTrailEntry {
        entity_type: RecordKind::from_str(&entity_type).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        entity_id: row.get(1)?,
        archive_location: row.get(2)?,
        archived_by: row.get(3)?,
        archived_at: parse_ts(&archived_at)?,
        uncompressed_size: row.get::<_, i64>(5)? as u64,
        compressed_size: row.get::<_, i64>(6)? as u64,
        payload_sha256: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: i64) -> ArchiveRecord {
        ArchiveRecord {
            id,
            kind: RecordKind::Enrollment,
            snapshot_json: r#"{"kind":"enrollment","id":1}"#.to_string(),
            archived_at: Utc::now(),
            archived_by: "archive-job".to_string(),
            archive_location: format!("/archive/2026/08/enrollment_{id}.tar.gz.enc"),
        }
    }

    fn entry(id: i64) -> AuditTrailEntry {
        AuditTrailEntry {
            entity_type: RecordKind::Enrollment,
            entity_id: id,
            archive_location: format!("/archive/2026/08/enrollment_{id}.tar.gz.enc"),
            archived_by: "archive-job".to_string(),
            archived_at: Utc::now(),
            uncompressed_size: 30720,
            compressed_size: 1024,
            payload_sha256: "deadbeef".to_string(),
        }
    }

    #[test]
    fn test_archive_record_roundtrip() {
        let db = Db::memory().unwrap();
        let rec = record(1);
        insert_archive_record(&db.conn(), &rec).unwrap();

        let got = db.get_archive_record(RecordKind::Enrollment, 1).unwrap().unwrap();
        assert_eq!(got.id, rec.id);
        assert_eq!(got.snapshot_json, rec.snapshot_json);
        assert_eq!(got.archive_location, rec.archive_location);
        assert!(db.get_archive_record(RecordKind::Defense, 1).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_archive_record_is_rejected() {
        let db = Db::memory().unwrap();
        insert_archive_record(&db.conn(), &record(1)).unwrap();
        assert!(insert_archive_record(&db.conn(), &record(1)).is_err());
    }

    #[test]
    fn test_audit_entry_roundtrip_and_uniqueness() {
        let db = Db::memory().unwrap();
        insert_audit_entry(&db.conn(), &entry(1)).unwrap();

        let got = db.get_audit_entry(RecordKind::Enrollment, 1).unwrap().unwrap();
        assert_eq!(got.uncompressed_size, 30720);
        assert_eq!(got.payload_sha256, "deadbeef");

        // One entry per archived id, enforced by the UNIQUE index.
        assert!(insert_audit_entry(&db.conn(), &entry(1)).is_err());
    }

    #[test]
    fn test_list_audit_entries_filters_by_kind() {
        let db = Db::memory().unwrap();
        insert_audit_entry(&db.conn(), &entry(1)).unwrap();
        insert_audit_entry(&db.conn(), &entry(2)).unwrap();
        let mut defense = entry(3);
        defense.entity_type = RecordKind::Defense;
        insert_audit_entry(&db.conn(), &defense).unwrap();

        assert_eq!(db.list_audit_entries(None).unwrap().len(), 3);
        let enrollments = db.list_audit_entries(Some(RecordKind::Enrollment)).unwrap();
        assert_eq!(enrollments.len(), 2);
        assert!(enrollments.iter().all(|e| e.entity_type == RecordKind::Enrollment));
    }
}
