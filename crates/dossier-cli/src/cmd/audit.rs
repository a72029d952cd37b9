use crate::args::AuditArgs;
use anyhow::{Context, Result};
use dossier_archive::{Db, RecordKind};
use std::str::FromStr;

pub fn execute(args: AuditArgs) -> Result<i32> {
    let kind = args
        .kind
        .as_deref()
        .map(RecordKind::from_str)
        .transpose()?;
    let db = Db::open(&args.db)
        .with_context(|| format!("opening database {}", args.db.display()))?;

    let entries = db.list_audit_entries(kind).context("reading audit trail")?;
    if entries.is_empty() {
        println!("no audit entries");
        return Ok(0);
    }

    for entry in entries {
        println!(
            "{} {}/{} by {} -> {} ({} -> {} bytes, sha256 {})",
            entry.archived_at.to_rfc3339(),
            entry.entity_type,
            entry.entity_id,
            entry.archived_by,
            entry.archive_location,
            entry.uncompressed_size,
            entry.compressed_size,
            entry.payload_sha256,
        );
    }
    Ok(0)
}
