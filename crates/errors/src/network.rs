//! Network-related error types
//!
//! Transfers are delegated to an external fetch command, so most failures
//! describe how that command could not be run or what it returned.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NetworkError {
    #[error("no fetch command configured")]
    MissingCommand,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("could not find or read directory {path}")]
    DirectoryUnavailable { path: String },

    #[error("could not spawn command: {message}")]
    SpawnFailed { command: String, message: String },

    #[error("command returned error code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("command did not execute correctly")]
    Terminated { command: String },

    #[error("could not rename {path}: {message}")]
    RenameFailed { path: String, message: String },
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingCommand => Some("Set transaction.xfer_command in the configuration."),
            Self::CommandFailed { .. } | Self::Terminated { .. } => {
                Some("Check network connectivity and the mirror list, then retry.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::CommandFailed { .. } | Self::Terminated { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::MissingCommand => "network.missing_command",
            Self::InvalidUrl(_) => "network.invalid_url",
            Self::DirectoryUnavailable { .. } => "network.directory_unavailable",
            Self::SpawnFailed { .. } => "network.spawn_failed",
            Self::CommandFailed { .. } => "network.command_failed",
            Self::Terminated { .. } => "network.terminated",
            Self::RenameFailed { .. } => "network.rename_failed",
        };
        Some(code)
    }
}
