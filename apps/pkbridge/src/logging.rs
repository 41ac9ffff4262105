//! Tracing setup and structured logging of job events

use pkbridge_events::{EventLevel, EventMessage, JobEvent};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise pkbridge logs at `level` (or debug
/// with `--debug`) and everything else at warn. JSON mode writes JSON
/// records so stderr stays machine readable next to the JSON report.
pub fn init_tracing(json_mode: bool, debug: bool, level: &str) {
    let level = if debug { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,pkbridge={level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json_mode {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Log a job event at its own level with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    let event = &message.event;

    macro_rules! emit {
        ($macro:ident) => {
            tracing::$macro!(
                event_target = event.log_target(),
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                "{}",
                summarize(event)
            )
        };
    }

    match meta.level {
        EventLevel::Error => emit!(error),
        EventLevel::Warn => emit!(warn),
        EventLevel::Info => emit!(info),
        EventLevel::Debug => emit!(debug),
        EventLevel::Trace => emit!(trace),
    }
}

fn summarize(event: &JobEvent) -> String {
    match event {
        JobEvent::StatusChanged { status } => format!("status {status}"),
        JobEvent::Percentage { percent } => format!("{percent}%"),
        JobEvent::SubPercentage { percent } => format!("step {percent}%"),
        JobEvent::Package {
            package_id, info, ..
        } => format!("{info} {package_id}"),
        JobEvent::Message { text } => format!("message ({} bytes)", text.len()),
        JobEvent::Files { package_id, files } => format!("files for {package_id}: {files}"),
        JobEvent::Error { kind, failure } => format!("{kind}: {}", failure.message),
        JobEvent::AllowCancel { allowed } => format!("allow cancel {allowed}"),
        JobEvent::Finished { success } => format!("finished, success={success}"),
    }
}
