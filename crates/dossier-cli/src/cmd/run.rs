use crate::args::RunArgs;
use anyhow::{Context, Result};
use dossier_archive::{ArchiveConfig, ArchiveJob, CancelToken, Db, RecordKind};
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

pub fn execute(args: RunArgs) -> Result<i32> {
    let mut config = load_config(&args)?;
    if let Some(days) = args.retention_days {
        config.retention.enrollment_days = days;
        config.retention.defense_days = days;
    }
    if let Some(actor) = args.actor.clone() {
        config.actor = actor;
    }

    let kinds = resolve_kinds(&args.kinds);
    if kinds.is_empty() {
        anyhow::bail!("no valid record kinds to archive");
    }

    let cipher = super::cipher_from_env(&args.key_env)
        .with_context(|| format!("loading bundle key from ${}", args.key_env))?;
    let db = Db::open(&args.db)
        .with_context(|| format!("opening database {}", args.db.display()))?;
    let job = ArchiveJob::new(db, config, Arc::new(cipher));
    let cancel = CancelToken::new();

    for kind in kinds {
        let summary = job
            .run(kind, &cancel)
            .with_context(|| format!("archival run for kind '{kind}' failed"))?;

        println!(
            "{kind}: selected={} packaged={} archived={} (partial={}) failed={} purged={} purge_failures={}",
            summary.selected,
            summary.packaged,
            summary.archived(),
            summary.partial,
            summary.failed,
            summary.files_purged,
            summary.purge_failures,
        );
        for failure in &summary.failures {
            println!(
                "  failed {}/{} at {:?}: {}",
                failure.kind, failure.id, failure.stage, failure.reason
            );
        }
    }

    // Per-item failures are reported in the summary, not as an error.
    Ok(0)
}

fn load_config(args: &RunArgs) -> Result<ArchiveConfig> {
    if let Some(path) = &args.config {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening config {}", path.display()))?;
        let config: ArchiveConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("parsing config {}", path.display()))?;
        return Ok(config);
    }
    // clap enforces presence when --config is absent.
    let uploads = args.uploads_root.clone().context("--uploads-root required")?;
    let archive = args.archive_root.clone().context("--archive-root required")?;
    Ok(ArchiveConfig::new(uploads, archive))
}

/// Parse requested kinds; unknown names are logged and skipped, they never
/// crash the run. No names means every kind.
fn resolve_kinds(requested: &[String]) -> Vec<RecordKind> {
    if requested.is_empty() {
        return RecordKind::ALL.to_vec();
    }
    let mut kinds = Vec::new();
    for name in requested {
        match RecordKind::from_str(name) {
            Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Ok(_) => {}
            Err(e) => warn!(kind = %name, error = %e, "unknown record kind, skipped"),
        }
    }
    kinds
}
