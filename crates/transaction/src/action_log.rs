//! Action log: one line per completed package change

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use pkbridge_errors::Error;

/// Destination for "installed foo (1.0)" style lines
pub trait ActionLog: Send {
    /// # Errors
    ///
    /// Returns an error when the line cannot be recorded.
    fn log_action(&mut self, line: &str) -> Result<(), Error>;
}

/// Appends `[TIMESTAMP] [PREFIX] line` to a log file shared with the engine
#[derive(Debug, Clone)]
pub struct FileActionLog {
    path: PathBuf,
    prefix: String,
}

impl FileActionLog {
    pub fn new(path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActionLog for FileActionLog {
    fn log_action(&mut self, line: &str) -> Result<(), Error> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::io_with_path(&e, &self.path))?;

        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%z");
        writeln!(file, "[{timestamp}] [{}] {line}", self.prefix)
            .map_err(|e| Error::io_with_path(&e, &self.path))
    }
}

/// Sends action lines to tracing instead of a file
#[derive(Debug, Clone, Default)]
pub struct TracingActionLog;

impl ActionLog for TracingActionLog {
    fn log_action(&mut self, line: &str) -> Result<(), Error> {
        tracing::info!(target: "pkbridge::action", "{line}");
        Ok(())
    }
}
