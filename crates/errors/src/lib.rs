#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for pkbridge
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone so they can travel through the job
//! report channel alongside the events that describe them.

use std::borrow::Cow;

use thiserror::Error;

pub mod config;
pub mod network;
pub mod transaction;

// Re-export all error types at the root
pub use config::ConfigError;
pub use network::NetworkError;
pub use transaction::{EngineErrorCode, ErrorKind, TransactionError};

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Reporting category used when the error reaches the job client.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::ConfigInvalid,
            Error::Transaction(err) => err.kind(),
            Error::Network(_) | Error::Internal(_) | Error::Cancelled | Error::Io { .. } => {
                ErrorKind::EngineError
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

/// Result type alias for pkbridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for the job client.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Transaction(err) => err.user_message(),
            Error::Config(err) => err.user_message(),
            Error::Network(err) => err.user_message(),
            Error::Io { message, .. } => Cow::Owned(message.clone()),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Transaction(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            Error::Network(err) => err.user_hint(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Transaction(err) => err.is_retryable(),
            Error::Network(err) => err.is_retryable(),
            Error::Io { .. } => true,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Config(err) => err.user_code(),
            Error::Transaction(err) => err.user_code(),
            Error::Network(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Cancelled => Some("error.cancelled"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}
