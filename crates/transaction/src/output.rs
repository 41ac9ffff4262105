//! Per-package output buffering

use std::sync::Arc;

use pkbridge_events::EventEmitter;
use pkbridge_types::PackageRef;

/// Collects engine output for the package currently being acted upon and
/// emits it as one message when that package is done.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    current: Option<PackageRef>,
    buffer: Option<String>,
}

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `package` current, flushing a different current package first
    pub fn start<E: EventEmitter + ?Sized>(&mut self, package: &PackageRef, sink: &E) {
        if let Some(current) = &self.current {
            if Arc::ptr_eq(current, package) || **current == **package {
                return;
            }
            self.end(sink);
        }
        self.current = Some(Arc::clone(package));
    }

    /// Append to the current package's buffer; dropped when nothing is current
    pub fn append(&mut self, text: &str) {
        let Some(current) = &self.current else {
            tracing::trace!("dropping output with no current package");
            return;
        };

        self.buffer
            .get_or_insert_with(|| format!("<b>{}</b>\n", current.name))
            .push_str(text);
    }

    /// Emit any buffered text and forget the current package
    pub fn end<E: EventEmitter + ?Sized>(&mut self, sink: &E) {
        self.current = None;
        if let Some(buffer) = self.buffer.take() {
            sink.emit_message(buffer);
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&PackageRef> {
        self.current.as_ref()
    }
}
