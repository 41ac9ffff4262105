//! Controller side of a job: start the worker, forward cancel requests

use std::sync::Arc;

use pkbridge_errors::Error;
use pkbridge_events::{EventEmitter, EventSender};
use pkbridge_types::{Role, Status};
use tokio::task::JoinHandle;

use crate::cancel::CancelBridge;
use crate::context::{JobContext, JobParams};

/// Runs one job at a time on a blocking worker
#[derive(Debug, Clone, Default)]
pub struct JobRunner {
    bridge: Arc<CancelBridge>,
}

impl JobRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a job started through this runner
    #[must_use]
    pub fn job(&self, role: Role, params: JobParams, sender: EventSender) -> JobContext {
        JobContext::new(role, Arc::clone(&self.bridge))
            .with_params(params)
            .with_event_sender(sender)
    }

    #[must_use]
    pub fn bridge(&self) -> &Arc<CancelBridge> {
        &self.bridge
    }

    /// Create the cancellation token, announce the job and spawn `body`.
    ///
    /// Must be called from within a tokio runtime. The handle resolves to
    /// whatever `body` returns, normally the result of
    /// [`JobContext::finish`].
    pub fn start<F>(&self, context: JobContext, status: Status, body: F) -> JoinHandle<bool>
    where
        F: FnOnce(JobContext) -> bool + Send + 'static,
    {
        let token = self.bridge.begin_transaction();
        tracing::debug!(job = %context.job_id(), generation = token.generation, role = %context.role(), "starting job");

        context.emit_allow_cancel(true);
        context.emit_status(status);

        tokio::task::spawn_blocking(move || body(context))
    }

    /// Ask the running job to stop.
    ///
    /// Returns `true` when this request cancelled the job.
    ///
    /// # Errors
    ///
    /// Returns an error when no job is running.
    pub fn cancel(&self) -> Result<bool, Error> {
        self.bridge.request_cancel().map_err(Into::into)
    }
}
