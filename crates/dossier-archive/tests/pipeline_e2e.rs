//! End-to-end pipeline runs against a real filesystem tree and an in-memory
//! database.

use chrono::{Datelike, Duration, Utc};
use dossier_archive::bundle::{read_container, SNAPSHOT_ENTRY};
use dossier_archive::{
    AesGcmProvider, ArchiveConfig, ArchiveJob, CancelToken, Db, DefenseRow, EncryptionProvider,
    EnrollmentRow, KeyMaterial, RecordKind, Snapshot,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const KEY: [u8; 32] = [0x42; 32];

fn provider() -> Arc<AesGcmProvider> {
    Arc::new(AesGcmProvider::new(&KeyMaterial { key: KEY }).unwrap())
}

fn write_doc(root: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, bytes).unwrap();
    path
}

fn setup() -> (TempDir, Db, ArchiveConfig) {
    // Pipeline stages log per-item progress; route it through the test writer.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let tmp = TempDir::new().unwrap();
    let uploads = tmp.path().join("uploads");
    let archive = tmp.path().join("archive");
    fs::create_dir_all(&uploads).unwrap();
    let db = Db::memory().unwrap();
    let config = ArchiveConfig::new(uploads, archive);
    (tmp, db, config)
}

/// The worked example: enrollment 42, validated 400 days ago, two documents
/// of 10 KiB and 20 KiB.
#[test]
fn archives_validated_enrollment_end_to_end() {
    let (_tmp, db, config) = setup();
    let now = Utc::now();
    db.insert_enrollment(&EnrollmentRow {
        id: 42,
        student_name: "Ada Lovelace".to_string(),
        program: "mathematics".to_string(),
        status: "validated".to_string(),
        submitted_at: now - Duration::days(420),
        validated_at: Some(now - Duration::days(400)),
        archived: false,
    })
    .unwrap();
    let transcript = write_doc(
        &config.uploads_root,
        "enrollments/42/transcript.pdf",
        &vec![0xaa; 10 * 1024],
    );
    let diploma = write_doc(
        &config.uploads_root,
        "enrollments/42/diploma.pdf",
        &vec![0xbb; 20 * 1024],
    );

    let job = ArchiveJob::new(db.clone(), config.clone(), provider());
    let summary = job.run(RecordKind::Enrollment, &CancelToken::new()).unwrap();

    assert_eq!(summary.selected, 1);
    assert_eq!(summary.packaged, 1);
    assert_eq!(summary.committed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.files_purged, 2);

    // Archive record exists, keyed by the original id, at the expected
    // partitioned location.
    let record = db
        .get_archive_record(RecordKind::Enrollment, 42)
        .unwrap()
        .expect("archive record for id 42");
    let location = PathBuf::from(&record.archive_location);
    assert!(location.exists());
    let rel = location.strip_prefix(&config.archive_root).unwrap();
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    assert_eq!(parts[0], format!("{:04}", record.archived_at.year()));
    assert_eq!(parts[1], format!("{:02}", record.archived_at.month()));
    assert!(parts[2].starts_with("enrollment_42_"));
    assert!(parts[2].ends_with(".tar.gz.enc"));

    // Audit trail records the metric sizes.
    let audit = db
        .get_audit_entry(RecordKind::Enrollment, 42)
        .unwrap()
        .expect("audit entry for id 42");
    assert_eq!(audit.uncompressed_size, 30720);
    assert!(audit.compressed_size > 0);
    assert_eq!(audit.archive_location, record.archive_location);

    // Source row retired, originals purged from the uploads tree.
    assert!(db.get_enrollment(42).unwrap().unwrap().archived);
    assert!(!transcript.exists());
    assert!(!diploma.exists());
}

/// Decrypting and unpacking the persisted bundle reproduces the exact set of
/// original file contents, plus the snapshot.
#[test]
fn bundle_roundtrip_reproduces_original_contents() {
    let (_tmp, db, config) = setup();
    let now = Utc::now();
    db.insert_enrollment(&EnrollmentRow {
        id: 7,
        student_name: "Alan".to_string(),
        program: "logic".to_string(),
        status: "validated".to_string(),
        submitted_at: now - Duration::days(420),
        validated_at: Some(now - Duration::days(400)),
        archived: false,
    })
    .unwrap();
    write_doc(&config.uploads_root, "enrollments/7/a.bin", b"alpha-bytes");
    write_doc(&config.uploads_root, "enrollments/7/b.bin", b"beta-bytes");

    let job = ArchiveJob::new(db.clone(), config.clone(), provider());
    job.run(RecordKind::Enrollment, &CancelToken::new()).unwrap();

    let record = db.get_archive_record(RecordKind::Enrollment, 7).unwrap().unwrap();
    let sealed = fs::read(&record.archive_location).unwrap();
    let plain = provider().decrypt(&sealed).unwrap();
    let mut entries = read_container(&plain).unwrap();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["a.bin", "b.bin", SNAPSHOT_ENTRY]);
    assert_eq!(entries[0].1, b"alpha-bytes");
    assert_eq!(entries[1].1, b"beta-bytes");

    // The bundled snapshot matches the archive row's snapshot column.
    let bundled: Snapshot = serde_json::from_slice(&entries[2].1).unwrap();
    let stored: Snapshot = serde_json::from_str(&record.snapshot_json).unwrap();
    assert_eq!(bundled, stored);
    assert_eq!(bundled.id(), 7);
}

/// A resolved path pointing at a nonexistent file produces a bundle with the
/// remaining files and a committed item, not a failure.
#[test]
fn missing_document_does_not_fail_the_item() {
    let (_tmp, db, config) = setup();
    let now = Utc::now();
    db.insert_defense(&DefenseRow {
        id: 3,
        student_name: "Grace".to_string(),
        thesis_title: "Subroutines".to_string(),
        status: "completed".to_string(),
        scheduled_at: now - Duration::days(410),
        defended_at: Some(now - Duration::days(400)),
        report_path: Some("defenses/reports/3.pdf".to_string()),
        slides_path: Some("defenses/slides/3.pdf".to_string()),
        archived: false,
    })
    .unwrap();
    // Only the report exists on disk.
    write_doc(&config.uploads_root, "defenses/reports/3.pdf", b"the report");

    let job = ArchiveJob::new(db.clone(), config.clone(), provider());
    let summary = job.run(RecordKind::Defense, &CancelToken::new()).unwrap();

    assert_eq!(summary.committed, 1);
    assert_eq!(summary.failed, 0);

    let record = db.get_archive_record(RecordKind::Defense, 3).unwrap().unwrap();
    let sealed = fs::read(&record.archive_location).unwrap();
    let plain = provider().decrypt(&sealed).unwrap();
    let entries = read_container(&plain).unwrap();
    assert!(entries.iter().any(|(n, d)| n == "3.pdf" && d == b"the report"));
}

/// Running the selector again right after a successful archive excludes the
/// archived id; no duplicate archive record is ever created.
#[test]
fn rerun_is_idempotent() {
    let (_tmp, db, config) = setup();
    let now = Utc::now();
    for id in 1..=3 {
        db.insert_enrollment(&EnrollmentRow {
            id,
            student_name: format!("student-{id}"),
            program: "cs".to_string(),
            status: "validated".to_string(),
            submitted_at: now - Duration::days(420),
            validated_at: Some(now - Duration::days(400)),
            archived: false,
        })
        .unwrap();
    }

    let job = ArchiveJob::new(db.clone(), config, provider());
    let first = job.run(RecordKind::Enrollment, &CancelToken::new()).unwrap();
    assert_eq!(first.committed, 3);

    let second = job.run(RecordKind::Enrollment, &CancelToken::new()).unwrap();
    assert_eq!(second.selected, 0);

    assert_eq!(db.list_audit_entries(Some(RecordKind::Enrollment)).unwrap().len(), 3);
}

/// Both kinds run over the same database without interfering.
#[test]
fn kinds_are_archived_independently() {
    let (_tmp, db, config) = setup();
    let now = Utc::now();
    db.insert_enrollment(&EnrollmentRow {
        id: 1,
        student_name: "E".to_string(),
        program: "cs".to_string(),
        status: "validated".to_string(),
        submitted_at: now - Duration::days(420),
        validated_at: Some(now - Duration::days(400)),
        archived: false,
    })
    .unwrap();
    db.insert_defense(&DefenseRow {
        id: 1,
        student_name: "D".to_string(),
        thesis_title: "T".to_string(),
        status: "completed".to_string(),
        scheduled_at: now - Duration::days(410),
        defended_at: Some(now - Duration::days(400)),
        report_path: None,
        slides_path: None,
        archived: false,
    })
    .unwrap();

    let job = ArchiveJob::new(db.clone(), config, provider());
    let cancel = CancelToken::new();
    assert_eq!(job.run(RecordKind::Enrollment, &cancel).unwrap().committed, 1);
    assert_eq!(job.run(RecordKind::Defense, &cancel).unwrap().committed, 1);

    // Same original id, two independent archive stores and audit entries.
    assert!(db.get_archive_record(RecordKind::Enrollment, 1).unwrap().is_some());
    assert!(db.get_archive_record(RecordKind::Defense, 1).unwrap().is_some());
    assert_eq!(db.list_audit_entries(None).unwrap().len(), 2);
}
