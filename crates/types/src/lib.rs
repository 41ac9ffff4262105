#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for pkbridge
//!
//! This crate provides the vocabulary shared between the engine boundary,
//! the transaction translator and the job client: package metadata,
//! dependency expressions, failure payloads and job status enums.

pub mod failure;
pub mod job;
pub mod package;

// Re-export commonly used types
pub use failure::{Conflict, DepMissing, EngineFailure, FailureDetails, FileConflict};
pub use job::{InfoKind, Role, Status};
pub use package::{DepMod, Depend, DependParseError, Package, PackageRef};
