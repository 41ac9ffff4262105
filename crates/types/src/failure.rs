//! Failure payloads returned by the engine when prepare or commit fails

use crate::{Depend, PackageRef};
use pkbridge_errors::EngineErrorCode;
use serde::{Deserialize, Serialize};

/// A dependency of `target` that nothing in the transaction satisfies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepMissing {
    pub target: String,
    pub depend: Depend,
    #[serde(default)]
    pub causing: Option<String>,
}

/// Two packages that cannot be installed together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub package1: String,
    pub package2: String,
    pub reason: Depend,
}

/// A file claimed by `target` that already belongs to something else
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConflict {
    pub target: String,
    pub file: String,
    /// Package that already owns `file`; `None` when the file is untracked.
    #[serde(default)]
    pub ctarget: Option<String>,
}

/// Detail list attached to a failure; its shape depends on the error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "entries", rename_all = "snake_case")]
pub enum FailureDetails {
    #[default]
    None,
    InvalidArch(Vec<PackageRef>),
    UnsatisfiedDeps(Vec<DepMissing>),
    ConflictingDeps(Vec<Conflict>),
    FileConflicts(Vec<FileConflict>),
    InvalidPackages(Vec<String>),
    /// Entries the engine attached to a code that normally carries none.
    Unrecognized(Vec<String>),
}

impl FailureDetails {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::InvalidArch(list) => list.is_empty(),
            Self::UnsatisfiedDeps(list) => list.is_empty(),
            Self::ConflictingDeps(list) => list.is_empty(),
            Self::FileConflicts(list) => list.is_empty(),
            Self::InvalidPackages(list) | Self::Unrecognized(list) => list.is_empty(),
        }
    }
}

/// Everything the engine reports about a failed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFailure {
    pub code: EngineErrorCode,
    /// The engine's description of `code`.
    pub message: String,
    #[serde(default)]
    pub details: FailureDetails,
}

impl EngineFailure {
    pub fn new(code: EngineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: FailureDetails::None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: FailureDetails) -> Self {
        self.details = details;
        self
    }
}
