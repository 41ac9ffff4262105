#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Job event channel for pkbridge
//!
//! Everything a transaction reports to its job client (status changes,
//! progress, package notices, free-form output, errors) travels as a
//! [`JobEvent`] over an unbounded channel. Each event is wrapped in an
//! [`EventMessage`] carrying [`EventMeta`] so consumers can order and log
//! it without inspecting the payload.

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod events;
pub use events::{FailureContext, JobEvent};

use pkbridge_errors::Error;
use pkbridge_types::{InfoKind, Status};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Envelope carried by the channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: JobEvent,
}

impl EventMessage {
    #[must_use]
    pub fn new(meta: EventMeta, event: JobEvent) -> Self {
        Self { meta, event }
    }
}

pub type EventSender = UnboundedSender<EventMessage>;

pub type EventReceiver = UnboundedReceiver<EventMessage>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting job events
///
/// Implemented by the raw [`EventSender`] and by anything that holds one.
/// Sending never fails from the caller's point of view: a dropped receiver
/// just means nobody is listening any more.
pub trait EventEmitter {
    fn event_sender(&self) -> Option<&EventSender>;

    /// Correlation id stamped on every emitted event, if any
    fn correlation_id(&self) -> Option<&str> {
        None
    }

    /// Emit an event with explicit metadata
    fn emit_with_meta(&self, meta: EventMeta, event: JobEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(EventMessage::new(meta, event));
        }
    }

    fn emit(&self, event: JobEvent) {
        let mut meta = EventMeta::new(event.log_level(), event.event_source());
        if let Some(id) = self.correlation_id() {
            meta = meta.with_correlation_id(id);
        }
        self.emit_with_meta(meta, event);
    }

    fn emit_status(&self, status: Status) {
        self.emit(JobEvent::StatusChanged { status });
    }

    /// Emit overall progress; values above 100 are clamped
    fn emit_percentage(&self, percent: u32) {
        self.emit(JobEvent::Percentage {
            percent: clamp_percent(percent),
        });
    }

    /// Emit step progress; values above 100 are clamped
    fn emit_sub_percentage(&self, percent: u32) {
        self.emit(JobEvent::SubPercentage {
            percent: clamp_percent(percent),
        });
    }

    fn emit_package(&self, info: InfoKind, package_id: impl Into<String>, summary: Option<String>) {
        self.emit(JobEvent::Package {
            package_id: package_id.into(),
            summary,
            info,
        });
    }

    fn emit_message(&self, text: impl Into<String>) {
        self.emit(JobEvent::Message { text: text.into() });
    }

    fn emit_files(&self, package_id: impl Into<String>, files: impl Into<String>) {
        self.emit(JobEvent::Files {
            package_id: package_id.into(),
            files: files.into(),
        });
    }

    /// Emit an error event for a failed job
    fn emit_error(&self, error: &Error) {
        self.emit(JobEvent::Error {
            kind: error.kind(),
            failure: FailureContext::from_error(error),
        });
    }

    fn emit_allow_cancel(&self, allowed: bool) {
        self.emit(JobEvent::AllowCancel { allowed });
    }

    fn emit_finished(&self, success: bool) {
        self.emit(JobEvent::Finished { success });
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

fn clamp_percent(percent: u32) -> u8 {
    u8::try_from(percent.min(100)).unwrap_or(100)
}
