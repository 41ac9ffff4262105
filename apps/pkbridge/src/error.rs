//! CLI error handling

use std::fmt;

use pkbridge_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(pkbridge_errors::Error),
    /// Job or transaction error
    Job(pkbridge_errors::Error),
    /// Invalid command arguments
    InvalidArguments(String),
    /// Worker task failed to complete
    Worker(String),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e.user_message()),
            CliError::Job(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Worker(msg) => write!(f, "Worker failed: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) | CliError::Job(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<pkbridge_errors::Error> for CliError {
    fn from(e: pkbridge_errors::Error) -> Self {
        match e {
            pkbridge_errors::Error::Config(_) => CliError::Config(e),
            e => CliError::Job(e),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<tokio::task::JoinError> for CliError {
    fn from(e: tokio::task::JoinError) -> Self {
        CliError::Worker(e.to_string())
    }
}
