//! Packaging: turn one candidate into a self-contained, encrypted bundle.
//!
//! Snapshot first, then kind-specific document resolution, then a
//! deterministic tar.gz sealed with the encryption provider. A missing
//! document is logged and skipped; it never fails the item.

use crate::bundle::{ContainerWriter, SNAPSHOT_ENTRY};
use crate::config::ArchiveConfig;
use crate::crypto::EncryptionProvider;
use crate::error::PackagingError;
use crate::kind::RecordKind;
use crate::model::{ArchiveBundle, ArchiveCandidate};
use chrono::{DateTime, Datelike, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Packager {
    uploads_root: PathBuf,
    archive_root: PathBuf,
    actor: String,
    crypto: Arc<dyn EncryptionProvider>,
}

impl Packager {
    pub fn new(config: &ArchiveConfig, crypto: Arc<dyn EncryptionProvider>) -> Self {
        Self {
            uploads_root: config.uploads_root.clone(),
            archive_root: config.archive_root.clone(),
            actor: config.actor.clone(),
            crypto,
        }
    }

    /// Package one candidate. Per-item failures (snapshot serialization,
    /// container build, encryption) fail only this item; the job-level
    /// retry/skip policy lives with the caller.
    pub fn package(&self, candidate: &ArchiveCandidate) -> Result<ArchiveBundle, PackagingError> {
        let kind = candidate.kind();
        let id = candidate.id();

        // Immutable copy of the archivable fields; no further source reads.
        let snapshot = candidate.snapshot();
        let snapshot_json = serde_json::to_string_pretty(&snapshot)
            .map_err(|source| PackagingError::Snapshot { kind, id, source })?;

        let paths = self.resolve_document_paths(candidate);

        let mut raw = Vec::new();
        let mut uncompressed_size: u64 = 0;
        {
            let mut writer = ContainerWriter::new(&mut raw);
            writer
                .append(SNAPSHOT_ENTRY, snapshot_json.as_bytes())
                .map_err(|source| PackagingError::Container { kind, id, source })?;
            for path in &paths {
                let bytes = match fs::read(path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(
                            kind = %kind,
                            id,
                            path = %path.display(),
                            error = %e,
                            "document unreadable, skipped from bundle"
                        );
                        continue;
                    }
                };
                uncompressed_size += bytes.len() as u64;
                let name = base_name(path);
                writer
                    .append(&name, &bytes)
                    .map_err(|source| PackagingError::Container { kind, id, source })?;
            }
            writer
                .finish()
                .map_err(|source| PackagingError::Container { kind, id, source })?;
        }

        let encrypted_payload = self.crypto.encrypt(&raw).map_err(|e| {
            PackagingError::Encryption {
                kind,
                id,
                reason: e.to_string(),
            }
        })?;
        let compressed_size = encrypted_payload.len() as u64;
        let payload_sha256 = hex::encode(Sha256::digest(&encrypted_payload));

        let timestamp = Utc::now();
        let target_location = self.target_location(kind, id, timestamp);

        debug!(
            kind = %kind,
            id,
            documents = paths.len(),
            uncompressed_size,
            compressed_size,
            target = %target_location.display(),
            "packaged candidate"
        );

        Ok(ArchiveBundle {
            kind,
            original_id: id,
            snapshot,
            snapshot_json,
            encrypted_payload,
            target_location,
            original_file_paths: paths,
            actor: self.actor.clone(),
            timestamp,
            uncompressed_size,
            compressed_size,
            payload_sha256,
        })
    }

    /// Kind-specific document conventions:
    /// - enrollments: scan `{uploads_root}/enrollments/{id}/`
    /// - defenses: explicit stored path fields (relative to the uploads root)
    ///   plus an optional `{uploads_root}/defenses/{id}/` scan
    ///
    /// The result is order-preserving and deduplicated.
    pub fn resolve_document_paths(&self, candidate: &ArchiveCandidate) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        match candidate {
            ArchiveCandidate::Enrollment(row) => {
                let dir = self.uploads_root.join("enrollments").join(row.id.to_string());
                paths.extend(scan_entity_dir(&dir));
            }
            ArchiveCandidate::Defense(row) => {
                for rel in [row.report_path.as_deref(), row.slides_path.as_deref()]
                    .into_iter()
                    .flatten()
                {
                    paths.push(self.uploads_root.join(rel));
                }
                let dir = self.uploads_root.join("defenses").join(row.id.to_string());
                paths.extend(scan_entity_dir(&dir));
            }
        }

        let mut seen = HashSet::new();
        paths.retain(|p| seen.insert(p.clone()));
        paths
    }

    /// `{archive_root}/{yyyy}/{MM}/{kind}_{id}_{yyyyMMdd_HHmmss}.tar.gz.enc`.
    /// Year/month partitioning bounds directory fan-out; the timestamp keeps
    /// re-runs of the same id unique.
    fn target_location(&self, kind: RecordKind, id: i64, timestamp: DateTime<Utc>) -> PathBuf {
        self.archive_root
            .join(format!("{:04}", timestamp.year()))
            .join(format!("{:02}", timestamp.month()))
            .join(format!(
                "{}_{}_{}.tar.gz.enc",
                kind,
                id,
                timestamp.format("%Y%m%d_%H%M%S")
            ))
    }
}

/// Per-entity directory scan: regular files only, sorted by name for
/// deterministic ordering. A missing or unreadable directory is simply empty.
fn scan_entity_dir(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::read_container;
    use crate::crypto::{AesGcmProvider, KeyMaterial};
    use crate::model::{DefenseRow, EnrollmentRow, Snapshot};
    use chrono::Duration;
    use tempfile::TempDir;

    fn provider() -> Arc<AesGcmProvider> {
        Arc::new(AesGcmProvider::new(&KeyMaterial { key: [3u8; 32] }).unwrap())
    }

    fn setup(tmp: &TempDir) -> (ArchiveConfig, Packager) {
        let uploads = tmp.path().join("uploads");
        let archive = tmp.path().join("archive");
        fs::create_dir_all(&uploads).unwrap();
        let config = ArchiveConfig::new(&uploads, &archive);
        let packager = Packager::new(&config, provider());
        (config, packager)
    }

    fn enrollment_candidate(id: i64) -> ArchiveCandidate {
        let now = Utc::now();
        ArchiveCandidate::Enrollment(EnrollmentRow {
            id,
            student_name: "Ada".to_string(),
            program: "cs".to_string(),
            status: "validated".to_string(),
            submitted_at: now - Duration::days(500),
            validated_at: Some(now - Duration::days(400)),
            archived: false,
        })
    }

    fn defense_candidate(id: i64, report: Option<&str>, slides: Option<&str>) -> ArchiveCandidate {
        let now = Utc::now();
        ArchiveCandidate::Defense(DefenseRow {
            id,
            student_name: "Grace".to_string(),
            thesis_title: "On compilers".to_string(),
            status: "completed".to_string(),
            scheduled_at: now - Duration::days(420),
            defended_at: Some(now - Duration::days(400)),
            report_path: report.map(String::from),
            slides_path: slides.map(String::from),
            archived: false,
        })
    }

    fn write_doc(root: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_package_enrollment_with_documents() {
        let tmp = TempDir::new().unwrap();
        let (config, packager) = setup(&tmp);
        write_doc(&config.uploads_root, "enrollments/42/transcript.pdf", &[1u8; 100]);
        write_doc(&config.uploads_root, "enrollments/42/diploma.pdf", &[2u8; 200]);

        let bundle = packager.package(&enrollment_candidate(42)).unwrap();

        assert_eq!(bundle.kind, RecordKind::Enrollment);
        assert_eq!(bundle.original_id, 42);
        assert_eq!(bundle.uncompressed_size, 300);
        assert_eq!(bundle.compressed_size, bundle.encrypted_payload.len() as u64);
        assert_eq!(bundle.original_file_paths.len(), 2);

        let plain = provider().decrypt(&bundle.encrypted_payload).unwrap();
        let entries = read_container(&plain).unwrap();
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec![SNAPSHOT_ENTRY, "diploma.pdf", "transcript.pdf"]);

        let snapshot: Snapshot = serde_json::from_slice(&entries[0].1).unwrap();
        assert_eq!(snapshot.id(), 42);
    }

    #[test]
    fn test_missing_document_is_skipped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let (config, packager) = setup(&tmp);
        write_doc(&config.uploads_root, "defenses/reports/7.pdf", b"report");
        // slides path points at nothing on disk
        let candidate =
            defense_candidate(7, Some("defenses/reports/7.pdf"), Some("defenses/slides/7.pdf"));

        let bundle = packager.package(&candidate).unwrap();

        // Both resolved, one bundled.
        assert_eq!(bundle.original_file_paths.len(), 2);
        assert_eq!(bundle.uncompressed_size, 6);
        let plain = provider().decrypt(&bundle.encrypted_payload).unwrap();
        let entries = read_container(&plain).unwrap();
        assert_eq!(entries.len(), 2); // snapshot + report
        assert_eq!(entries[1].0, "7.pdf");
    }

    #[test]
    fn test_snapshot_only_bundle_when_no_documents() {
        let tmp = TempDir::new().unwrap();
        let (_config, packager) = setup(&tmp);

        let bundle = packager.package(&enrollment_candidate(1)).unwrap();

        assert!(bundle.original_file_paths.is_empty());
        assert_eq!(bundle.uncompressed_size, 0);
        let plain = provider().decrypt(&bundle.encrypted_payload).unwrap();
        let entries = read_container(&plain).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, SNAPSHOT_ENTRY);
    }

    #[test]
    fn test_defense_paths_are_deduplicated() {
        let tmp = TempDir::new().unwrap();
        let (config, packager) = setup(&tmp);
        // The stored report path lives inside the scanned per-entity dir.
        write_doc(&config.uploads_root, "defenses/9/report.pdf", b"rep");
        write_doc(&config.uploads_root, "defenses/9/annex.pdf", b"ann");
        let candidate = defense_candidate(9, Some("defenses/9/report.pdf"), None);

        let paths = packager.resolve_document_paths(&candidate);

        assert_eq!(paths.len(), 2);
        // Stored field first, then the remaining scanned file.
        assert!(paths[0].ends_with("defenses/9/report.pdf"));
        assert!(paths[1].ends_with("defenses/9/annex.pdf"));
    }

    #[test]
    fn test_target_location_layout() {
        let tmp = TempDir::new().unwrap();
        let (config, packager) = setup(&tmp);

        let bundle = packager.package(&enrollment_candidate(42)).unwrap();

        let rel = bundle
            .target_location
            .strip_prefix(&config.archive_root)
            .unwrap();
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], format!("{:04}", bundle.timestamp.year()));
        assert_eq!(parts[1], format!("{:02}", bundle.timestamp.month()));
        assert!(parts[2].starts_with("enrollment_42_"));
        assert!(parts[2].ends_with(".tar.gz.enc"));
    }
}
