use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dossier",
    version,
    about = "Archive aging dossier records: package, encrypt, persist, retire"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the archival pipeline for one or all record kinds
    Run(RunArgs),
    /// List audit-trail entries of completed archivals
    Audit(AuditArgs),
    /// Decrypt a bundle and list (or extract) its contents
    Inspect(InspectArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Path to the SQLite database
    #[arg(long)]
    pub db: PathBuf,

    /// YAML pipeline configuration (uploads_root, archive_root, tuning)
    #[arg(long, conflicts_with_all = ["uploads_root", "archive_root"])]
    pub config: Option<PathBuf>,

    /// Base directory for source documents
    #[arg(long, required_unless_present = "config")]
    pub uploads_root: Option<PathBuf>,

    /// Base directory for persisted bundles
    #[arg(long, required_unless_present = "config")]
    pub archive_root: Option<PathBuf>,

    /// Record kinds to archive (default: all)
    #[arg(long = "kind")]
    pub kinds: Vec<String>,

    /// Override the retention threshold, in days, for every kind
    #[arg(long)]
    pub retention_days: Option<u32>,

    /// Recorded as archived_by on archive and audit rows
    #[arg(long)]
    pub actor: Option<String>,

    /// Environment variable holding the 32-byte bundle key (hex or base64)
    #[arg(long, default_value = "DOSSIER_ARCHIVE_KEY")]
    pub key_env: String,
}

#[derive(clap::Args, Debug)]
pub struct AuditArgs {
    /// Path to the SQLite database
    #[arg(long)]
    pub db: PathBuf,

    /// Only entries of this record kind
    #[arg(long)]
    pub kind: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Path to a persisted bundle (*.tar.gz.enc)
    pub bundle: PathBuf,

    /// Extract entries into this directory instead of listing them
    #[arg(long)]
    pub extract_to: Option<PathBuf>,

    /// Environment variable holding the 32-byte bundle key (hex or base64)
    #[arg(long, default_value = "DOSSIER_ARCHIVE_KEY")]
    pub key_env: String,
}
