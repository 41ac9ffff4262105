#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! File transfer for pkbridge
//!
//! The engine normally downloads on its own. When a fetch command is
//! configured it hands every transfer to a [`Fetcher`] instead, and
//! [`XferCommand`] runs that external command.

mod xfer;

pub use xfer::{basename_of, XferCommand};

use pkbridge_errors::Error;
use std::path::{Path, PathBuf};

/// Something that can place the file behind `url` into `directory`
pub trait Fetcher: Send + Sync {
    /// Fetch `url` into `directory` and return the final path.
    ///
    /// With `force` any stale partial or complete file is removed first.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` when the directory is unusable, the command
    /// cannot be run or exits unsuccessfully, or the partial file cannot be
    /// renamed.
    fn fetch(&self, url: &str, directory: &Path, force: bool) -> Result<PathBuf, Error>;
}
