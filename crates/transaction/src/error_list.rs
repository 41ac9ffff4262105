//! Turns the detail list of a failed prepare or commit into an error

use pkbridge_errors::TransactionError;
use pkbridge_types::{Conflict, DepMissing, EngineFailure, FailureDetails, FileConflict};

/// Human-readable summary of the detail list, `None` when there is nothing
/// to say.
#[must_use]
pub fn build_prefix(details: &FailureDetails) -> Option<String> {
    let entries: Vec<String> = match details {
        FailureDetails::None => return None,
        FailureDetails::InvalidArch(packages) => {
            packages.iter().map(|pkg| pkg.name.clone()).collect()
        }
        FailureDetails::UnsatisfiedDeps(missing) => missing.iter().map(format_missing).collect(),
        FailureDetails::ConflictingDeps(conflicts) => {
            conflicts.iter().map(format_conflict).collect()
        }
        FailureDetails::FileConflicts(conflicts) => {
            conflicts.iter().map(format_file_conflict).collect()
        }
        FailureDetails::InvalidPackages(names) => names.clone(),
        FailureDetails::Unrecognized(entries) => {
            if !entries.is_empty() {
                tracing::warn!(count = entries.len(), "unhandled failure details");
            }
            return None;
        }
    };

    if entries.is_empty() {
        None
    } else {
        Some(entries.join(", "))
    }
}

/// Consume a failure and produce the error reported for it
#[must_use]
pub fn into_error(failure: EngineFailure) -> TransactionError {
    let EngineFailure {
        code,
        message,
        details,
    } = failure;
    let prefix = build_prefix(&details);
    TransactionError::engine(code, prefix, message)
}

/// Error for calls that never carry details (init, release, signatures)
#[must_use]
pub fn bare_error(failure: EngineFailure) -> TransactionError {
    TransactionError::engine(failure.code, None, failure.message)
}

fn format_missing(miss: &DepMissing) -> String {
    format!("{} <- {}", miss.depend, miss.target)
}

fn format_conflict(conflict: &Conflict) -> String {
    let reason = &conflict.reason;
    if reason.name == conflict.package1 || reason.name == conflict.package2 {
        format!("{} <-> {}", conflict.package1, conflict.package2)
    } else {
        format!(
            "{} <-> {} ({reason})",
            conflict.package1, conflict.package2
        )
    }
}

fn format_file_conflict(conflict: &FileConflict) -> String {
    match conflict.ctarget.as_deref().filter(|ctarget| !ctarget.is_empty()) {
        Some(ctarget) => format!("{} <-> {ctarget} ({})", conflict.target, conflict.file),
        None => format!("{} ({})", conflict.target, conflict.file),
    }
}
