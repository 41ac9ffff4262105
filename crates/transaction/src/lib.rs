#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Transaction progress and event translation for pkbridge
//!
//! This crate sits between a package [`Engine`] and the job client. It turns
//! the engine's synchronous callbacks into [`pkbridge_events::JobEvent`]s,
//! answers the engine's questions on the user's behalf, summarizes failures
//! into readable errors and forwards cancel requests from the controller to
//! the running worker.

#[macro_use]
mod macros;
mod action_log;
mod cancel;
mod context;
mod conversation;
mod download;
mod engine;
pub mod error_list;
pub mod jobs;
mod output;
mod progress;
mod runner;
mod script;
mod transaction;
mod translator;

pub use action_log::{ActionLog, FileActionLog, TracingActionLog};
pub use cancel::{CancelBridge, CancellationToken};
pub use context::{JobContext, JobParams};
pub use conversation::{resolve, Resolution};
pub use download::{DownloadAggregator, DownloadProgress};
pub use engine::{
    Answer, Engine, EngineEvent, Interrupt, LogLevel, ProgressKind, Question, TransFlags,
    TransactionCallbacks,
};
pub use output::OutputBuffer;
pub use progress::{ProgressCalculator, StepProgress};
pub use runner::JobRunner;
pub use script::{Phase, Script, ScriptedEngine, Step};
pub use transaction::Transaction;
pub use translator::{new_optdepends, EventTranslator};

// Re-exported for callers wiring up a job
pub use pkbridge_events::{EventReceiver, EventSender};
