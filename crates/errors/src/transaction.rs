//! Transaction error types
//!
//! Engine failures keep the engine's own error code and message; the
//! transaction layer only adds a structured prefix naming the offending
//! packages, dependencies or files.

use std::borrow::Cow;
use std::fmt;

use crate::UserFacingError;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Error categories reported to the job client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    ConfigInvalid,
    PackageHeld,
    InvalidArchitecture,
    UnsatisfiedDependencies,
    ConflictingDependencies,
    FileConflicts,
    InvalidPackageOrDelta,
    EngineError,
}

impl ErrorKind {
    /// Stable identifier used in structured output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigInvalid => "config_invalid",
            Self::PackageHeld => "package_held",
            Self::InvalidArchitecture => "invalid_architecture",
            Self::UnsatisfiedDependencies => "unsatisfied_dependencies",
            Self::ConflictingDependencies => "conflicting_dependencies",
            Self::FileConflicts => "file_conflicts",
            Self::InvalidPackageOrDelta => "invalid_package_or_delta",
            Self::EngineError => "engine_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine error codes returned by the package engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EngineErrorCode {
    Memory,
    System,
    BadPermissions,
    DiskSpace,
    HandleLock,
    DatabaseNotFound,
    DatabaseInvalid,
    TransactionNotNull,
    TransactionNull,
    TransactionDuplicateTarget,
    TransactionNotInitialized,
    TransactionNotPrepared,
    TransactionAborted,
    PackageNotFound,
    PackageIgnored,
    PackageInvalid,
    PackageInvalidChecksum,
    PackageInvalidSignature,
    PackageOpen,
    PackageInvalidArch,
    DeltaInvalid,
    DeltaPatchFailed,
    UnsatisfiedDeps,
    ConflictingDeps,
    FileConflicts,
    Retrieve,
    ExternalDownload,
    Other(i32),
}

impl EngineErrorCode {
    /// Reporting category for this engine code.
    #[must_use]
    pub fn kind(self) -> ErrorKind {
        match self {
            Self::PackageInvalidArch => ErrorKind::InvalidArchitecture,
            Self::UnsatisfiedDeps => ErrorKind::UnsatisfiedDependencies,
            Self::ConflictingDeps => ErrorKind::ConflictingDependencies,
            Self::FileConflicts => ErrorKind::FileConflicts,
            Self::PackageInvalid | Self::DeltaInvalid => ErrorKind::InvalidPackageOrDelta,
            _ => ErrorKind::EngineError,
        }
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "other({code})"),
            code => write!(f, "{code:?}"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransactionError {
    #[error("{package}: could not remove held package")]
    PackageHeld { package: String },

    #[error("{}", engine_message(.prefix, .message))]
    Engine {
        code: EngineErrorCode,
        prefix: Option<String>,
        message: String,
    },

    #[error("no transaction in progress")]
    NoActiveTransaction,
}

#[allow(clippy::ref_option)]
fn engine_message(prefix: &Option<String>, message: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}: {message}"),
        None => message.to_string(),
    }
}

impl TransactionError {
    /// Build an engine error from its code, optional detail prefix and the
    /// engine's own description of the code.
    pub fn engine(
        code: EngineErrorCode,
        prefix: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Engine {
            code,
            prefix,
            message: message.into(),
        }
    }

    /// Reporting category for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PackageHeld { .. } => ErrorKind::PackageHeld,
            Self::Engine { code, .. } => code.kind(),
            Self::NoActiveTransaction => ErrorKind::EngineError,
        }
    }

    /// Engine code, when the error originated in the engine.
    #[must_use]
    pub fn engine_code(&self) -> Option<EngineErrorCode> {
        match self {
            Self::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl UserFacingError for TransactionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::PackageHeld => {
                Some("Remove the package from hold_packages if removing it is intended.")
            }
            ErrorKind::UnsatisfiedDependencies | ErrorKind::ConflictingDependencies => {
                Some("Refresh the package databases or adjust the requested targets.")
            }
            ErrorKind::FileConflicts => {
                Some("Another package or an untracked file already owns the listed paths.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self.engine_code(),
            Some(EngineErrorCode::HandleLock | EngineErrorCode::Retrieve)
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self.kind() {
            ErrorKind::ConfigInvalid => "transaction.config_invalid",
            ErrorKind::PackageHeld => "transaction.package_held",
            ErrorKind::InvalidArchitecture => "transaction.invalid_architecture",
            ErrorKind::UnsatisfiedDependencies => "transaction.unsatisfied_dependencies",
            ErrorKind::ConflictingDependencies => "transaction.conflicting_dependencies",
            ErrorKind::FileConflicts => "transaction.file_conflicts",
            ErrorKind::InvalidPackageOrDelta => "transaction.invalid_package_or_delta",
            ErrorKind::EngineError => "transaction.engine_error",
        };
        Some(code)
    }
}
