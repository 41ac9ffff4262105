use serde::{Deserialize, Serialize};

use crate::EventSource;
use pkbridge_errors::{ErrorKind, UserFacingError};
use pkbridge_types::{InfoKind, Status};

/// Structured failure information attached to error events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

/// Everything a running job reports to its client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// The job moved to a new phase
    StatusChanged { status: Status },

    /// Overall job progress, 0-100
    Percentage { percent: u8 },

    /// Progress of the current step or file, 0-100
    SubPercentage { percent: u8 },

    /// Something happened to a package
    Package {
        package_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
        info: InfoKind,
    },

    /// Free-form output, usually attributed to one package
    Message { text: String },

    /// Files fetched for a package, separated by `;`
    Files { package_id: String, files: String },

    /// The job failed
    Error {
        kind: ErrorKind,
        failure: FailureContext,
    },

    /// Whether the client may currently cancel the job
    AllowCancel { allowed: bool },

    /// The job is done; no events follow
    Finished { success: bool },
}

impl JobEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::StatusChanged { .. } | Self::AllowCancel { .. } | Self::Finished { .. } => {
                EventSource::JOB
            }
            Self::Percentage { .. } | Self::SubPercentage { .. } => EventSource::PROGRESS,
            Self::Package { .. } | Self::Files { .. } => EventSource::PACKAGE,
            Self::Message { .. } => EventSource::OUTPUT,
            Self::Error { .. } => EventSource::ERROR,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::Error { .. } => Level::ERROR,
            Self::Finished { success: false } => Level::WARN,
            Self::Percentage { .. } | Self::SubPercentage { .. } | Self::AllowCancel { .. } => {
                Level::DEBUG
            }
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self.event_source().as_str() {
            "progress" => "pkbridge::events::progress",
            "package" => "pkbridge::events::package",
            "output" => "pkbridge::events::output",
            "error" => "pkbridge::events::error",
            _ => "pkbridge::events::job",
        }
    }
}
