//! Source-side operations: seeding live rows, the batched eligibility query
//! and the conditional archived-flag update.

use super::{parse_ts, Db};
use crate::error::SelectionError;
use crate::kind::RecordKind;
use crate::model::{ArchiveCandidate, DefenseRow, EnrollmentRow};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

impl Db {
    /// Insert a live enrollment row (business workflows, fixtures).
    pub fn insert_enrollment(&self, row: &EnrollmentRow) -> rusqlite::Result<()> {
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO enrollments (
                id, student_name, program, status, submitted_at, validated_at, archived
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                row.id,
                row.student_name,
                row.program,
                row.status,
                row.submitted_at.to_rfc3339(),
                row.validated_at.map(|t| t.to_rfc3339()),
                row.archived as i32,
            ],
        )?;
        Ok(())
    }

    /// Insert a live defense row (business workflows, fixtures).
    pub fn insert_defense(&self, row: &DefenseRow) -> rusqlite::Result<()> {
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO defenses (
                id, student_name, thesis_title, status, scheduled_at, defended_at,
                report_path, slides_path, archived
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                row.id,
                row.student_name,
                row.thesis_title,
                row.status,
                row.scheduled_at.to_rfc3339(),
                row.defended_at.map(|t| t.to_rfc3339()),
                row.report_path,
                row.slides_path,
                row.archived as i32,
            ],
        )?;
        Ok(())
    }

    pub fn get_enrollment(&self, id: i64) -> rusqlite::Result<Option<EnrollmentRow>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, student_name, program, status, submitted_at, validated_at, archived
             FROM enrollments WHERE id = ?1",
            [id],
            map_enrollment,
        )
        .optional()
    }

    pub fn get_defense(&self, id: i64) -> rusqlite::Result<Option<DefenseRow>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, student_name, thesis_title, status, scheduled_at, defended_at,
                    report_path, slides_path, archived
             FROM defenses WHERE id = ?1",
            [id],
            map_defense,
        )
        .optional()
    }

    /// One page of archive-eligible candidates, ordered ascending by id,
    /// starting strictly after `last_id`.
    ///
    /// Eligible: `archived = 0`, status in the kind's allowed set, threshold
    /// date non-NULL and strictly older than `cutoff`. NULL threshold dates
    /// are "not yet eligible", never an error.
    pub fn fetch_candidates_page(
        &self,
        kind: RecordKind,
        cutoff: DateTime<Utc>,
        last_id: i64,
        limit: usize,
    ) -> Result<Vec<ArchiveCandidate>, SelectionError> {
        let statuses = kind
            .eligible_statuses()
            .iter()
            .map(|s| format!("'{s}'"))
            .collect::<Vec<_>>()
            .join(", ");
        let threshold = kind.threshold_column();

        let conn = self.conn();
        let candidates = match kind {
            RecordKind::Enrollment => {
                let sql = format!(
                    "SELECT id, student_name, program, status, submitted_at, validated_at, archived
                     FROM enrollments
                     WHERE archived = 0 AND status IN ({statuses})
                       AND {threshold} IS NOT NULL AND {threshold} < ?1
                       AND id > ?2
                     ORDER BY id ASC LIMIT ?3"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    params![cutoff.to_rfc3339(), last_id, limit as i64],
                    |row| map_enrollment(row).map(ArchiveCandidate::Enrollment),
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            RecordKind::Defense => {
                let sql = format!(
                    "SELECT id, student_name, thesis_title, status, scheduled_at, defended_at,
                            report_path, slides_path, archived
                     FROM defenses
                     WHERE archived = 0 AND status IN ({statuses})
                       AND {threshold} IS NOT NULL AND {threshold} < ?1
                       AND id > ?2
                     ORDER BY id ASC LIMIT ?3"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    params![cutoff.to_rfc3339(), last_id, limit as i64],
                    |row| map_defense(row).map(ArchiveCandidate::Defense),
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(candidates)
    }
}

/// Conditional flag set inside the commit transaction. Returns false when no
/// row matched (already archived by a concurrent run, or deleted).
pub(crate) fn set_archived(conn: &Connection, kind: RecordKind, id: i64) -> rusqlite::Result<bool> {
    let sql = format!(
        "UPDATE {} SET archived = 1 WHERE id = ?1 AND archived = 0",
        kind.source_table()
    );
    let changed = conn.execute(&sql, [id])?;
    Ok(changed == 1)
}

fn map_enrollment(row: &Row<'_>) -> rusqlite::Result<EnrollmentRow> {
    let submitted_at: String = row.get(4)?;
    let validated_at: Option<String> = row.get(5)?;
    Ok(EnrollmentRow {
        id: row.get(0)?,
        student_name: row.get(1)?,
        program: row.get(2)?,
        status: row.get(3)?,
        submitted_at: parse_ts(&submitted_at)?,
        validated_at: validated_at.as_deref().map(parse_ts).transpose()?,
        archived: row.get::<_, i64>(6)? != 0,
    })
}

fn map_defense(row: &Row<'_>) -> rusqlite::Result<DefenseRow> {
    let scheduled_at: String = row.get(4)?;
    let defended_at: Option<String> = row.get(5)?;
    Ok(DefenseRow {
        id: row.get(0)?,
        student_name: row.get(1)?,
        thesis_title: row.get(2)?,
        status: row.get(3)?,
        scheduled_at: parse_ts(&scheduled_at)?,
        defended_at: defended_at.as_deref().map(parse_ts).transpose()?,
        report_path: row.get(6)?,
        slides_path: row.get(7)?,
        archived: row.get::<_, i64>(8)? != 0,
    })
}
