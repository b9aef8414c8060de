//! # Accession Common Library
//!
//! Shared code for the batch accessioner:
//! - Error type used by startup and configuration paths
//! - TOML configuration loading
//! - Logging initialization (rotating file via tracing-appender)

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};
