//! External transfer command with `%u` / `%o` placeholders

use std::path::{Path, PathBuf};
use std::process::Command;

use pkbridge_errors::{Error, NetworkError};
use url::Url;

use crate::Fetcher;

const URL_PLACEHOLDER: &str = "%u";
const OUTPUT_PLACEHOLDER: &str = "%o";
const PART_SUFFIX: &str = ".part";

/// A user-configured download command such as `curl -L -o %o %u`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XferCommand {
    template: String,
}

impl XferCommand {
    /// # Errors
    ///
    /// Returns `NetworkError::MissingCommand` for an empty template.
    pub fn new(template: impl Into<String>) -> Result<Self, Error> {
        let template = template.into();
        if template.split_whitespace().next().is_none() {
            return Err(NetworkError::MissingCommand.into());
        }
        Ok(Self { template })
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether the command writes to the partial file itself
    #[must_use]
    pub fn uses_output(&self) -> bool {
        self.template.contains(OUTPUT_PLACEHOLDER)
    }

    /// Split the template into program and arguments with placeholders filled
    fn render(&self, url: &str, part: &Path) -> Vec<String> {
        let part = part.display().to_string();
        self.template
            .split_whitespace()
            .map(|arg| {
                arg.replace(OUTPUT_PLACEHOLDER, &part)
                    .replace(URL_PLACEHOLDER, url)
            })
            .collect()
    }
}

impl Fetcher for XferCommand {
    fn fetch(&self, url: &str, directory: &Path, force: bool) -> Result<PathBuf, Error> {
        if !directory.is_dir() {
            tracing::warn!(path = %directory.display(), "could not find or read directory");
            return Err(NetworkError::DirectoryUnavailable {
                path: directory.display().to_string(),
            }
            .into());
        }

        let basename = basename_of(url)?;
        let file = directory.join(&basename);
        let part = directory.join(format!("{basename}{PART_SUFFIX}"));

        if force {
            remove_stale(&part);
            remove_stale(&file);
        }

        let args = self.render(url, &part);
        let Some((program, rest)) = args.split_first() else {
            return Err(NetworkError::MissingCommand.into());
        };

        tracing::debug!(command = %args.join(" "), "running transfer command");

        let status = Command::new(program)
            .args(rest)
            .current_dir(directory)
            .status()
            .map_err(|e| NetworkError::SpawnFailed {
                command: program.clone(),
                message: e.to_string(),
            })?;

        if !status.success() {
            return Err(match status.code() {
                Some(code) => {
                    tracing::warn!(code, "command returned error code");
                    NetworkError::CommandFailed {
                        command: program.clone(),
                        code,
                    }
                }
                None => {
                    tracing::warn!("command did not execute correctly");
                    NetworkError::Terminated {
                        command: program.clone(),
                    }
                }
            }
            .into());
        }

        if self.uses_output() {
            std::fs::rename(&part, &file).map_err(|e| {
                tracing::warn!(path = %part.display(), "could not rename");
                NetworkError::RenameFailed {
                    path: part.display().to_string(),
                    message: e.to_string(),
                }
            })?;
        }

        Ok(file)
    }
}

fn remove_stale(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::debug!(path = %path.display(), error = %e, "could not remove stale file");
        }
    }
}

/// Last path component of a URL or plain path
///
/// # Errors
///
/// Returns `NetworkError::InvalidUrl` when nothing usable remains.
pub fn basename_of(url: &str) -> Result<String, Error> {
    let basename = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(ToString::to_string)),
        Err(_) => Path::new(url)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    };

    basename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| NetworkError::InvalidUrl(url.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename_of() {
        assert_eq!(
            basename_of("https://mirror.example/extra/os/x86_64/foo-1.0-1-x86_64.pkg.tar.zst")
                .unwrap(),
            "foo-1.0-1-x86_64.pkg.tar.zst"
        );
        assert_eq!(basename_of("/srv/repo/core.db").unwrap(), "core.db");
        assert!(basename_of("https://mirror.example/").is_err());
    }

    #[test]
    fn test_render_fills_placeholders() {
        let cmd = XferCommand::new("curl -L -o %o %u").unwrap();
        let args = cmd.render("https://m/x.pkg", Path::new("/tmp/x.pkg.part"));
        assert_eq!(
            args,
            vec!["curl", "-L", "-o", "/tmp/x.pkg.part", "https://m/x.pkg"]
        );
        assert!(cmd.uses_output());
        assert!(!XferCommand::new("fetch %u").unwrap().uses_output());
    }

    #[test]
    fn test_empty_template_is_missing() {
        assert!(XferCommand::new("   ").is_err());
    }
}
