use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Level;
use uuid::Uuid;

/// Metadata that accompanies every event on the channel.
///
/// Consumers use it to order events, correlate them with a job and route
/// them to the right log level.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    /// Unique identifier for this specific event.
    pub event_id: Uuid,
    /// Job or transaction the event belongs to.
    pub correlation_id: Option<String>,
    /// Timestamp captured at emission time.
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub source: EventSource,
}

impl EventMeta {
    /// Create a new metadata instance for a given source and level.
    #[must_use]
    pub fn new(level: impl Into<EventLevel>, source: EventSource) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            correlation_id: None,
            timestamp: Utc::now(),
            level: level.into(),
            source,
        }
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Lightweight severity levels used by the event system.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Level> for EventLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::TRACE => EventLevel::Trace,
            Level::DEBUG => EventLevel::Debug,
            Level::INFO => EventLevel::Info,
            Level::WARN => EventLevel::Warn,
            Level::ERROR => EventLevel::Error,
        }
    }
}

/// Component that originated the event.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventSource(Cow<'static, str>);

impl EventSource {
    pub const JOB: Self = Self::const_str("job");
    pub const PROGRESS: Self = Self::const_str("progress");
    pub const PACKAGE: Self = Self::const_str("package");
    pub const OUTPUT: Self = Self::const_str("output");
    pub const ERROR: Self = Self::const_str("error");

    const fn const_str(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
