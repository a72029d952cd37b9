//! Record kinds the pipeline can archive.
//!
//! A closed enum replaces runtime type inspection: every kind-specific
//! convention (eligibility statuses, threshold column, table names, document
//! layout) dispatches on the variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A kind of archivable source record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Enrollment,
    Defense,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Enrollment, RecordKind::Defense];

    /// Lowercase name used in file names, audit rows and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Enrollment => "enrollment",
            RecordKind::Defense => "defense",
        }
    }

    /// Lifecycle statuses that make a record of this kind archive-eligible.
    pub fn eligible_statuses(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Enrollment => &["validated"],
            RecordKind::Defense => &["completed"],
        }
    }

    pub(crate) fn source_table(&self) -> &'static str {
        match self {
            RecordKind::Enrollment => "enrollments",
            RecordKind::Defense => "defenses",
        }
    }

    pub(crate) fn archive_table(&self) -> &'static str {
        match self {
            RecordKind::Enrollment => "enrollment_archives",
            RecordKind::Defense => "defense_archives",
        }
    }

    /// Date column the retention threshold is compared against.
    pub(crate) fn threshold_column(&self) -> &'static str {
        match self {
            RecordKind::Enrollment => "validated_at",
            RecordKind::Defense => "defended_at",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown record kind '{0}'")]
pub struct UnknownKindError(pub String);

impl FromStr for RecordKind {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enrollment" => Ok(RecordKind::Enrollment),
            "defense" => Ok(RecordKind::Defense),
            other => Err(UnknownKindError(other.to_string())),
        }
    }
}
