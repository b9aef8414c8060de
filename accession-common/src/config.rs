//! Configuration loading
//!
//! The accessioner reads a single TOML file (default `watch.toml`) at
//! startup. Sections: `[manifest]`, `[watcher]`, `[repository]`,
//! `[logging]`. Missing keys fall back to defaults; a missing
//! `[repository]` section is a startup error since there is no sane
//! default repository endpoint.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "watch.toml";
pub const DEFAULT_WATCH_DIRECTORY: &str = "watch";
pub const DEFAULT_POLL_SECONDS: u64 = 30;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Manifest (metadata.csv) parsing options
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestConfig {
    /// Whether the manifest carries a header row to skip
    #[serde(default)]
    pub title_row: bool,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self { title_row: false }
    }
}

/// Directory watcher options
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    /// Directory polled for bundle archives
    #[serde(default = "default_watch_directory")]
    pub directory: PathBuf,
    /// Seconds between poll cycles
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            directory: default_watch_directory(),
            poll_seconds: default_poll_seconds(),
        }
    }
}

/// Repository endpoint and credentials
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    /// Base URL of the repository REST API
    pub url: String,
    pub username: String,
    pub password: String,
    /// Namespace new persistent identifiers are allocated under
    pub namespace: String,
}

/// Log file and level
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log file path; rotated daily, siblings keep the date suffix
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
    /// Level filter: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

fn default_watch_directory() -> PathBuf {
    PathBuf::from(DEFAULT_WATCH_DIRECTORY)
}

fn default_poll_seconds() -> u64 {
    DEFAULT_POLL_SECONDS
}

fn default_log_file() -> PathBuf {
    PathBuf::from("accession.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}
