//! Logging initialization
//!
//! All outcomes are recorded to a rotating log file; there is no separate
//! operator notification channel. The returned guard must be held for the
//! process lifetime or buffered log lines are lost on exit.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber writing to the configured
/// log file, rotated daily.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
    let directory = config
        .file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = config
        .file
        .file_name()
        .ok_or_else(|| Error::Config(format!("Invalid log file path: {}", config.file.display())))?;

    let appender = tracing_appender::rolling::daily(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", config.level, e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}
