//! Job-facing enums: the running role, the reported status and the
//! per-package info kinds

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// High-level operation a job is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    InstallFiles,
    SimulateInstallFiles,
    InstallPackages,
    DownloadPackages,
    UpdatePackages,
    RemovePackages,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InstallFiles => "install-files",
            Self::SimulateInstallFiles => "simulate-install-files",
            Self::InstallPackages => "install-packages",
            Self::DownloadPackages => "download-packages",
            Self::UpdatePackages => "update-packages",
            Self::RemovePackages => "remove-packages",
        };
        f.write_str(name)
    }
}

/// Status reported to the job client, derived from the engine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    Setup,
    Running,
    DependencyResolution,
    TestCommit,
    SignatureCheck,
    Download,
    Repackaging,
    Installing,
    Updating,
    Removing,
    Cancelled,
    Finished,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Setup => "setup",
            Self::Running => "running",
            Self::DependencyResolution => "resolving dependencies",
            Self::TestCommit => "testing changes",
            Self::SignatureCheck => "checking signatures",
            Self::Download => "downloading",
            Self::Repackaging => "repackaging",
            Self::Installing => "installing",
            Self::Updating => "updating",
            Self::Removing => "removing",
            Self::Cancelled => "cancelled",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// What is happening to a package reported to the job client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoKind {
    Installing,
    Updating,
    Removing,
    Downloading,
    Finished,
    Obsoleting,
}

impl fmt::Display for InfoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Installing => "installing",
            Self::Updating => "updating",
            Self::Removing => "removing",
            Self::Downloading => "downloading",
            Self::Finished => "finished",
            Self::Obsoleting => "obsoleting",
        };
        f.write_str(name)
    }
}
