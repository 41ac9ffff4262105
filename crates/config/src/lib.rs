#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for pkbridge
//!
//! This crate handles loading and merging configuration from:
//! - Default values (see [`constants`])
//! - Configuration file (~/.config/pkbridge/config.toml)
//! - Environment variables (`PKBRIDGE_*`)
//! - CLI flags

pub mod constants;

use pkbridge_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub transaction: TransactionConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default tracing level when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Settings that shape how transactions run and report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// External fetch command; `%u` is the URL, `%o` the partial output file
    #[serde(default)]
    pub xfer_command: Option<String>,
    /// Match delta patch basenames when attributing downloads
    #[serde(default)]
    pub use_delta: bool,
    /// Packages that may never be removed by a transaction
    #[serde(default = "default_hold_packages")]
    pub hold_packages: Vec<String>,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            xfer_command: None,
            use_delta: false,
            hold_packages: default_hold_packages(),
            log_file: default_log_file(),
            cache_dir: default_cache_dir(),
            log_prefix: default_log_prefix(),
        }
    }
}

// Default value functions for serde
fn default_log_level() -> String {
    constants::DEFAULT_LOG_LEVEL.to_string()
}

fn default_hold_packages() -> Vec<String> {
    constants::DEFAULT_HOLD_PACKAGES
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(constants::DEFAULT_LOG_FILE)
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(constants::DEFAULT_CACHE_DIR)
}

fn default_log_prefix() -> String {
    constants::DEFAULT_LOG_PREFIX.to_string()
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::CONFIG_DIR_NAME)
            .join(constants::CONFIG_FILE_NAME))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        tracing::debug!(path = %path.display(), "loaded configuration file");

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(level) = std::env::var("PKBRIDGE_LOG_LEVEL") {
            self.general.log_level = level;
        }

        if let Ok(command) = std::env::var("PKBRIDGE_XFER_COMMAND") {
            self.transaction.xfer_command = if command.trim().is_empty() {
                None
            } else {
                Some(command)
            };
        }

        if let Ok(delta) = std::env::var("PKBRIDGE_USE_DELTA") {
            self.transaction.use_delta = match delta.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "PKBRIDGE_USE_DELTA".to_string(),
                        value: delta,
                    }
                    .into())
                }
            };
        }

        // Comma or whitespace separated
        if let Ok(held) = std::env::var("PKBRIDGE_HOLD_PACKAGES") {
            self.transaction.hold_packages = held
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|name| !name.is_empty())
                .map(ToString::to_string)
                .collect();
        }

        if let Ok(path) = std::env::var("PKBRIDGE_LOG_FILE") {
            self.transaction.log_file = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("PKBRIDGE_CACHE_DIR") {
            self.transaction.cache_dir = PathBuf::from(path);
        }

        Ok(())
    }

    /// Check values that deserialize fine but cannot be used
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first offending value.
    pub fn validate(&self) -> Result<(), Error> {
        let level = self.general.log_level.to_ascii_lowercase();
        if !constants::LOG_LEVELS.contains(&level.as_str()) {
            return Err(invalid(format!(
                "general.log_level must be one of {}, got '{}'",
                constants::LOG_LEVELS.join(", "),
                self.general.log_level
            )));
        }

        if let Some(command) = &self.transaction.xfer_command {
            if !command.contains("%u") {
                return Err(invalid(format!(
                    "transaction.xfer_command must contain %u: '{command}'"
                )));
            }
        }

        if self.transaction.log_prefix.trim().is_empty() {
            return Err(invalid("transaction.log_prefix must not be empty"));
        }

        if self.transaction.cache_dir.as_os_str().is_empty() {
            return Err(invalid("transaction.cache_dir must not be empty"));
        }

        if let Some(name) = self
            .transaction
            .hold_packages
            .iter()
            .find(|name| name.trim().is_empty() || name.contains(char::is_whitespace))
        {
            return Err(invalid(format!(
                "transaction.hold_packages contains an invalid name '{name}'"
            )));
        }

        Ok(())
    }

    /// Whether `name` is protected from removal
    #[must_use]
    pub fn is_held(&self, name: &str) -> bool {
        self.transaction.hold_packages.iter().any(|held| held == name)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    ConfigError::Invalid {
        message: message.into(),
    }
    .into()
}
