//! The seam between pkbridge and a package engine
//!
//! An [`Engine`] resolves, downloads and applies packages. While it works it
//! calls back into a [`TransactionCallbacks`] implementation synchronously on
//! the same thread, once per lifecycle event, question, progress step,
//! download chunk and log line.

use std::path::Path;
use std::sync::Arc;

use bitflags::bitflags;
use pkbridge_net::Fetcher;
use pkbridge_types::{Depend, EngineFailure, PackageRef};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Flags passed to [`Engine::init`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TransFlags: u32 {
        const NO_DEPS = 1;
        const FORCE = 1 << 1;
        const NO_SAVE = 1 << 2;
        const NO_DEP_VERSION = 1 << 3;
        const CASCADE = 1 << 4;
        const RECURSE = 1 << 5;
        const DB_ONLY = 1 << 6;
        const ALL_DEPS = 1 << 8;
        const DOWNLOAD_ONLY = 1 << 9;
        const NO_SCRIPTLET = 1 << 10;
        const NO_CONFLICTS = 1 << 11;
        const NEEDED = 1 << 13;
        const ALL_EXPLICIT = 1 << 14;
        const UNNEEDED = 1 << 15;
        const RECURSE_ALL = 1 << 16;
        const NO_LOCK = 1 << 17;
    }
}

/// Lifecycle notifications raised by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    CheckDepsStart,
    CheckDepsDone,
    FileConflictsStart,
    FileConflictsDone,
    ResolveDepsStart,
    ResolveDepsDone,
    InterConflictsStart,
    InterConflictsDone,
    AddStart { package: PackageRef },
    AddDone { package: PackageRef },
    RemoveStart { package: PackageRef },
    RemoveDone { package: PackageRef },
    UpgradeStart { package: PackageRef, old: PackageRef },
    UpgradeDone { package: PackageRef, old: PackageRef },
    DowngradeStart { package: PackageRef, old: PackageRef },
    DowngradeDone { package: PackageRef, old: PackageRef },
    ReinstallStart {
        package: PackageRef,
        #[serde(default)]
        old: Option<PackageRef>,
    },
    ReinstallDone {
        package: PackageRef,
        #[serde(default)]
        old: Option<PackageRef>,
    },
    IntegrityStart,
    IntegrityDone,
    LoadStart,
    LoadDone,
    DeltaIntegrityStart,
    DeltaIntegrityDone,
    DeltaPatchesStart,
    DeltaPatchesDone,
    DeltaPatchStart,
    DeltaPatchDone,
    DeltaPatchFailed,
    ScriptletInfo { line: String },
    RetrieveStart,
    DiskspaceStart,
    DiskspaceDone,
    OptdepRequired { package: PackageRef, depend: Depend },
    DatabaseMissing { database: String },
    KeyringStart,
    KeyringDone,
    KeyDownloadStart,
    KeyDownloadDone,
    /// An event code this crate does not know about
    Other { code: u32 },
}

/// Interactive questions the engine asks mid-transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "question", rename_all = "snake_case")]
pub enum Question {
    InstallIgnorePkg {
        package: PackageRef,
    },
    ReplacePkg {
        old: PackageRef,
        new: PackageRef,
        repository: String,
    },
    ConflictPkg {
        target: String,
        conflicting: String,
        reason: Depend,
    },
    CorruptedPkg {
        filepath: String,
        reason: String,
    },
    LocalNewer {
        package: PackageRef,
    },
    RemovePkgs {
        packages: Vec<PackageRef>,
    },
    SelectProvider {
        providers: Vec<PackageRef>,
        depend: Depend,
    },
    ImportKey {
        fingerprint: String,
        uid: String,
    },
    Other {
        code: u32,
    },
}

/// Reply to a [`Question`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Yes,
    No,
    /// Position in a list of choices
    Index(usize),
    /// Leave the engine's default in place
    Unset,
}

/// Step kinds reported through [`TransactionCallbacks::on_progress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    AddStart,
    UpgradeStart,
    DowngradeStart,
    ReinstallStart,
    RemoveStart,
    ConflictsStart,
    DiskspaceStart,
    IntegrityStart,
    LoadStart,
    KeyringStart,
    Other(u32),
}

impl ProgressKind {
    /// Check phases whose step index the engine reports one behind
    #[must_use]
    pub fn is_start_boundary(self) -> bool {
        matches!(
            self,
            Self::ConflictsStart
                | Self::DiskspaceStart
                | Self::IntegrityStart
                | Self::LoadStart
                | Self::KeyringStart
        )
    }

    /// Steps that act on one named package
    #[must_use]
    pub fn is_package_step(self) -> bool {
        matches!(
            self,
            Self::AddStart
                | Self::UpgradeStart
                | Self::DowngradeStart
                | Self::ReinstallStart
                | Self::RemoveStart
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warning,
    Debug,
    Function,
}

/// Receiver for everything the engine reports during prepare and commit
pub trait TransactionCallbacks {
    fn on_event(&mut self, event: &EngineEvent);

    fn on_question(&mut self, question: &Question) -> Answer;

    /// `current` is 1-based and at most `count`
    fn on_progress(
        &mut self,
        kind: ProgressKind,
        target: &str,
        percent: i32,
        count: usize,
        current: usize,
    );

    /// Called repeatedly per file; `completed == 0` marks the start of a file
    fn on_download(&mut self, basename: &str, completed: i64, total: i64);

    /// Called once per download batch; negative totals mark database files
    fn on_total_size(&mut self, total: i64);

    fn on_log(&mut self, level: LogLevel, message: &str);
}

/// Asks a running engine to stop at its next safe point
pub trait Interrupt: Send + Sync {
    fn interrupt(&self);
}

impl<F> Interrupt for F
where
    F: Fn() + Send + Sync,
{
    fn interrupt(&self) {
        self();
    }
}

/// A package engine capable of running one transaction at a time
///
/// Every fallible call reports an [`EngineFailure`]; translating it into a
/// user-facing error is left to the caller.
pub trait Engine {
    /// Start a new transaction.
    ///
    /// # Errors
    ///
    /// Fails when a transaction is already active or the database is locked.
    fn init(&mut self, flags: TransFlags) -> Result<(), EngineFailure>;

    /// Queue a local package file for installation.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be loaded or is a duplicate target.
    fn add_file(&mut self, path: &Path) -> Result<(), EngineFailure>;

    /// Resolve dependencies and check the transaction.
    ///
    /// # Errors
    ///
    /// Fails with a detail list describing what blocked the transaction.
    fn prepare(&mut self, callbacks: &mut dyn TransactionCallbacks) -> Result<(), EngineFailure>;

    /// Download and apply the prepared transaction.
    ///
    /// # Errors
    ///
    /// Fails with a detail list describing what blocked the transaction.
    fn commit(&mut self, callbacks: &mut dyn TransactionCallbacks) -> Result<(), EngineFailure>;

    /// Drop the active transaction.
    ///
    /// # Errors
    ///
    /// Fails when no transaction is active.
    fn release(&mut self) -> Result<(), EngineFailure>;

    /// Handle that aborts the transaction from another thread
    fn interrupt_handle(&self) -> Arc<dyn Interrupt>;

    /// Packages the active transaction would install or upgrade
    fn pending_adds(&self) -> Vec<PackageRef>;

    /// Packages the active transaction would remove
    fn pending_removes(&self) -> Vec<PackageRef>;

    fn is_installed(&self, name: &str) -> bool;

    /// Toggle signature verification for local files.
    ///
    /// # Errors
    ///
    /// Fails when the engine cannot change its signature level.
    fn set_signature_checking(&mut self, enabled: bool) -> Result<(), EngineFailure>;

    /// Hand transfers to an external fetcher instead of the built-in one
    fn set_fetcher(&mut self, _fetcher: Option<Arc<dyn Fetcher>>) {}
}
