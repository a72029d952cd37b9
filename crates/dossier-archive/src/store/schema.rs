//! Relational schema: live source tables, per-kind archive tables and the
//! append-only audit trail. Dates are RFC3339 TEXT, flags INTEGER 0/1.

pub const ARCHIVE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS enrollments (
    id INTEGER PRIMARY KEY,
    student_name TEXT NOT NULL,
    program TEXT NOT NULL,
    status TEXT NOT NULL,
    submitted_at TEXT NOT NULL,
    validated_at TEXT,
    archived INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS defenses (
    id INTEGER PRIMARY KEY,
    student_name TEXT NOT NULL,
    thesis_title TEXT NOT NULL,
    status TEXT NOT NULL,
    scheduled_at TEXT NOT NULL,
    defended_at TEXT,
    report_path TEXT,
    slides_path TEXT,
    archived INTEGER NOT NULL DEFAULT 0
);

-- Eligibility scans: archived flag first, then status and threshold date,
-- id last for keyset continuation.
CREATE INDEX IF NOT EXISTS idx_enrollments_eligibility
    ON enrollments (archived, status, validated_at, id);
CREATE INDEX IF NOT EXISTS idx_defenses_eligibility
    ON defenses (archived, status, defended_at, id);

CREATE TABLE IF NOT EXISTS enrollment_archives (
    id INTEGER PRIMARY KEY,
    snapshot TEXT NOT NULL,
    archived_at TEXT NOT NULL,
    archived_by TEXT NOT NULL,
    archive_location TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS defense_archives (
    id INTEGER PRIMARY KEY,
    snapshot TEXT NOT NULL,
    archived_at TEXT NOT NULL,
    archived_by TEXT NOT NULL,
    archive_location TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_trail (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL,
    entity_id INTEGER NOT NULL,
    archive_location TEXT NOT NULL,
    archived_by TEXT NOT NULL,
    archived_at TEXT NOT NULL,
    uncompressed_size INTEGER NOT NULL,
    compressed_size INTEGER NOT NULL,
    payload_sha256 TEXT NOT NULL,
    UNIQUE (entity_type, entity_id)
);
"#;
