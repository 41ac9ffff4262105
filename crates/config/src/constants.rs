//! Defaults used when the configuration file leaves a value unset

pub const CONFIG_DIR_NAME: &str = "pkbridge";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const DEFAULT_LOG_FILE: &str = "/var/log/pacman.log";
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/pacman/pkg/";

/// Tag written in front of every action log line
pub const DEFAULT_LOG_PREFIX: &str = "PackageKit";

pub const DEFAULT_HOLD_PACKAGES: &[&str] = &["pacman", "glibc"];

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
