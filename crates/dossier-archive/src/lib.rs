//! Archival pipeline for aging dossier records.
//!
//! Three components, each depending only on the one before it:
//!
//! - [`selector::CandidateSelector`] streams archive-eligible source records
//!   in bounded, id-ordered pages.
//! - [`packager::Packager`] turns one candidate into a self-contained bundle:
//!   snapshot + documents, tar.gz'd and sealed with AES-256-GCM.
//! - [`committer::Committer`] durably persists a bundle and its bookkeeping
//!   (archive record, audit entry, archived flag — one transaction per
//!   bundle), then best-effort purges the originals.
//!
//! [`run::ArchiveJob`] wires them into a single sequential run over bounded
//! chunks. The relational store and the bundle file store cannot share a
//! transaction; the resulting orphan window is documented on the committer.

pub mod bundle;
pub mod committer;
pub mod config;
pub mod crypto;
pub mod error;
pub mod kind;
pub mod model;
pub mod packager;
pub mod run;
pub mod selector;
pub mod store;

// Convenience re-exports
pub use committer::{CommitOutcome, CommitStatus, Committer};
pub use config::{ArchiveConfig, RetentionPolicy};
pub use crypto::{
    AesGcmProvider, EncryptionProvider, EnvKeyProvider, KeyMaterial, KeyProvider,
    StaticKeyProvider,
};
pub use error::{CommitError, PackagingError, SelectionError};
pub use kind::{RecordKind, UnknownKindError};
pub use model::{
    ArchiveBundle, ArchiveCandidate, ArchiveRecord, AuditTrailEntry, DefenseRow, EnrollmentRow,
    Snapshot,
};
pub use packager::Packager;
pub use run::{ArchiveJob, CancelToken, FailureStage, ItemFailure, RunSummary};
pub use selector::CandidateSelector;
pub use store::Db;
