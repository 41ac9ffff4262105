//! A scripted engine that replays recorded callback sequences
//!
//! Scripts are plain JSON so recorded sessions can be replayed from the
//! command line as well as from tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pkbridge_errors::{EngineErrorCode, Error};
use pkbridge_net::Fetcher;
use pkbridge_types::{EngineFailure, Package, PackageRef};
use serde::{Deserialize, Serialize};

use crate::engine::{
    Answer, Engine, EngineEvent, Interrupt, LogLevel, ProgressKind, Question, TransFlags,
    TransactionCallbacks,
};

/// One callback the engine makes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Event(EngineEvent),
    Question(Question),
    Progress {
        kind: ProgressKind,
        #[serde(default)]
        target: String,
        percent: i32,
        count: usize,
        current: usize,
    },
    TotalSize {
        total: i64,
    },
    Download {
        basename: String,
        completed: i64,
        total: i64,
    },
    Log {
        level: LogLevel,
        message: String,
    },
    /// Fetch through the configured fetcher, if any
    Fetch {
        url: String,
        #[serde(default)]
        force: bool,
    },
    /// Cancel as if the controller had asked, for tests
    Interrupt,
}

/// Callbacks for one engine phase and how the phase ends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub failure: Option<EngineFailure>,
}

/// Everything a [`ScriptedEngine`] does
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Names of packages already installed
    #[serde(default)]
    pub installed: Vec<String>,
    /// Local package files `add_file` can load
    #[serde(default)]
    pub files: BTreeMap<PathBuf, Package>,
    #[serde(default)]
    pub pending_adds: Vec<PackageRef>,
    #[serde(default)]
    pub pending_removes: Vec<PackageRef>,
    #[serde(default)]
    pub prepare: Phase,
    #[serde(default)]
    pub commit: Phase,
    #[serde(default)]
    pub init_failure: Option<EngineFailure>,
    #[serde(default)]
    pub release_failure: Option<EngineFailure>,
}

impl Script {
    /// Parse a script from JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid script.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(Into::into)
    }

    /// Read and parse a script file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        Self::from_json(&text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Initialized,
    Prepared,
    Committed,
}

/// [`Engine`] implementation driven by a [`Script`]
pub struct ScriptedEngine {
    script: Script,
    state: State,
    pending_adds: Vec<PackageRef>,
    interrupted: Arc<AtomicBool>,
    signature_checking: bool,
    fetcher: Option<Arc<dyn Fetcher>>,
    fetch_dir: PathBuf,
    answers: Vec<Answer>,
    fetched: Vec<PathBuf>,
}

impl ScriptedEngine {
    #[must_use]
    pub fn new(script: Script) -> Self {
        Self {
            pending_adds: script.pending_adds.clone(),
            script,
            state: State::Idle,
            interrupted: Arc::new(AtomicBool::new(false)),
            signature_checking: true,
            fetcher: None,
            fetch_dir: std::env::temp_dir(),
            answers: Vec::new(),
            fetched: Vec::new(),
        }
    }

    /// Directory `fetch` steps download into
    #[must_use]
    pub fn with_fetch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fetch_dir = dir.into();
        self
    }

    /// Answers given to the script's questions, in order
    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Files produced by `fetch` steps
    #[must_use]
    pub fn fetched(&self) -> &[PathBuf] {
        &self.fetched
    }

    #[must_use]
    pub fn signature_checking(&self) -> bool {
        self.signature_checking
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state != State::Idle
    }

    fn run_phase(
        &mut self,
        phase: Phase,
        callbacks: &mut dyn TransactionCallbacks,
    ) -> Result<(), EngineFailure> {
        for step in phase.steps {
            if self.interrupted.load(Ordering::SeqCst) {
                return Err(EngineFailure::new(
                    EngineErrorCode::TransactionAborted,
                    "transaction aborted",
                ));
            }

            match step {
                Step::Event(event) => callbacks.on_event(&event),
                Step::Question(question) => {
                    let answer = callbacks.on_question(&question);
                    self.answers.push(answer);
                }
                Step::Progress {
                    kind,
                    target,
                    percent,
                    count,
                    current,
                } => callbacks.on_progress(kind, &target, percent, count, current),
                Step::TotalSize { total } => callbacks.on_total_size(total),
                Step::Download {
                    basename,
                    completed,
                    total,
                } => callbacks.on_download(&basename, completed, total),
                Step::Log { level, message } => callbacks.on_log(level, &message),
                Step::Fetch { url, force } => self.fetch(&url, force)?,
                Step::Interrupt => self.interrupted.store(true, Ordering::SeqCst),
            }
        }

        match phase.failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn fetch(&mut self, url: &str, force: bool) -> Result<(), EngineFailure> {
        let Some(fetcher) = &self.fetcher else {
            tracing::debug!(url, "no fetcher configured, skipping");
            return Ok(());
        };

        match fetcher.fetch(url, &self.fetch_dir, force) {
            Ok(path) => {
                self.fetched.push(path);
                Ok(())
            }
            Err(e) => Err(EngineFailure::new(
                EngineErrorCode::ExternalDownload,
                format!("failed to retrieve some files: {e}"),
            )),
        }
    }

    fn require(&self, state: State) -> Result<(), EngineFailure> {
        match (self.state, state) {
            (current, wanted) if current == wanted => Ok(()),
            (State::Idle, _) => Err(EngineFailure::new(
                EngineErrorCode::TransactionNotInitialized,
                "transaction not initialized",
            )),
            _ => Err(EngineFailure::new(
                EngineErrorCode::TransactionNotPrepared,
                "transaction not prepared",
            )),
        }
    }
}

impl Engine for ScriptedEngine {
    fn init(&mut self, _flags: TransFlags) -> Result<(), EngineFailure> {
        if self.state != State::Idle {
            return Err(EngineFailure::new(
                EngineErrorCode::TransactionNotNull,
                "transaction already initialized",
            ));
        }
        if let Some(failure) = self.script.init_failure.clone() {
            return Err(failure);
        }
        self.interrupted.store(false, Ordering::SeqCst);
        self.state = State::Initialized;
        Ok(())
    }

    fn add_file(&mut self, path: &Path) -> Result<(), EngineFailure> {
        self.require(State::Initialized)?;

        let package = self.script.files.get(path).cloned().ok_or_else(|| {
            EngineFailure::new(EngineErrorCode::PackageOpen, "cannot open package file")
        })?;
        if self.pending_adds.iter().any(|pkg| pkg.name == package.name) {
            return Err(EngineFailure::new(
                EngineErrorCode::TransactionDuplicateTarget,
                "duplicate target",
            ));
        }
        self.pending_adds.push(package.into_ref());
        Ok(())
    }

    fn prepare(&mut self, callbacks: &mut dyn TransactionCallbacks) -> Result<(), EngineFailure> {
        self.require(State::Initialized)?;
        let phase = self.script.prepare.clone();
        self.run_phase(phase, callbacks)?;
        self.state = State::Prepared;
        Ok(())
    }

    fn commit(&mut self, callbacks: &mut dyn TransactionCallbacks) -> Result<(), EngineFailure> {
        self.require(State::Prepared)?;
        let phase = self.script.commit.clone();
        self.run_phase(phase, callbacks)?;
        self.state = State::Committed;
        Ok(())
    }

    fn release(&mut self) -> Result<(), EngineFailure> {
        if self.state == State::Idle {
            return Err(EngineFailure::new(
                EngineErrorCode::TransactionNull,
                "transaction not initialized",
            ));
        }
        self.state = State::Idle;
        self.pending_adds = self.script.pending_adds.clone();
        match self.script.release_failure.clone() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn interrupt_handle(&self) -> Arc<dyn Interrupt> {
        let interrupted = Arc::clone(&self.interrupted);
        Arc::new(move || interrupted.store(true, Ordering::SeqCst))
    }

    fn pending_adds(&self) -> Vec<PackageRef> {
        self.pending_adds.clone()
    }

    fn pending_removes(&self) -> Vec<PackageRef> {
        self.script.pending_removes.clone()
    }

    fn is_installed(&self, name: &str) -> bool {
        self.script.installed.iter().any(|installed| installed == name)
    }

    fn set_signature_checking(&mut self, enabled: bool) -> Result<(), EngineFailure> {
        self.signature_checking = enabled;
        Ok(())
    }

    fn set_fetcher(&mut self, fetcher: Option<Arc<dyn Fetcher>>) {
        self.fetcher = fetcher;
    }
}
