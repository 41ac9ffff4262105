//! Job context handed to transaction workers

use std::path::PathBuf;
use std::sync::Arc;

use pkbridge_errors::Error;
use pkbridge_events::{EventEmitter, EventSender};
use pkbridge_types::{Role, Status};
use uuid::Uuid;

use crate::cancel::CancelBridge;

/// Key/value parameters the job was started with
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobParams {
    /// Local package files for install-files jobs
    pub full_paths: Vec<PathBuf>,
    /// Refuse packages whose signatures cannot be verified
    pub only_trusted: bool,
    /// Where download-packages jobs place their files
    pub directory: Option<PathBuf>,
}

params_builder! {
    JobParams {
        full_paths: Vec<PathBuf>,
        only_trusted: bool,
        directory: Option<PathBuf>,
    }
}

/// Everything a worker needs to report on one job
#[derive(Clone, Debug)]
pub struct JobContext {
    role: Role,
    params: JobParams,
    job_id: String,
    bridge: Arc<CancelBridge>,
    event_sender: Option<EventSender>,
}

impl JobContext {
    #[must_use]
    pub fn new(role: Role, bridge: Arc<CancelBridge>) -> Self {
        Self {
            role,
            params: JobParams::new(),
            job_id: Uuid::new_v4().to_string(),
            bridge,
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: JobParams) -> Self {
        self.params = params;
        self
    }

    /// Set the event sender for progress reporting
    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn params(&self) -> &JobParams {
        &self.params
    }

    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    #[must_use]
    pub fn bridge(&self) -> &Arc<CancelBridge> {
        &self.bridge
    }

    /// Whether the controller asked to cancel; `false` outside a transaction
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.bridge.is_cancelled().unwrap_or_else(|e| {
            tracing::warn!(job = %self.job_id, "cancellation queried outside a job: {e}");
            false
        })
    }

    /// Close the job: report `error` unless the job was cancelled, then
    /// emit the final status and the finished event.
    ///
    /// Returns whether the job succeeded.
    pub fn finish(&self, error: Option<Error>) -> bool {
        self.emit_allow_cancel(false);

        let cancelled = self.bridge.finish_transaction();

        match &error {
            Some(err) if cancelled => {
                tracing::debug!(job = %self.job_id, "suppressing error of cancelled job: {err}");
            }
            Some(err) => self.emit_error(err),
            None => {}
        }

        let success = error.is_none() && !cancelled;
        self.emit_status(if cancelled {
            Status::Cancelled
        } else {
            Status::Finished
        });
        self.emit_finished(success);
        success
    }
}

impl EventEmitter for JobContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }

    fn correlation_id(&self) -> Option<&str> {
        Some(&self.job_id)
    }
}
