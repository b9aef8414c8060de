//! accession-watch - Batch bundle ingest daemon
//!
//! Polls a drop directory for zip bundles, validates each bundle's
//! `metadata.csv` manifest, and ingests the described objects into the
//! repository. Rejected bundles land in `BAD/`, ingested ones in
//! `complete/`; unreadable archives are retried on the next cycle.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use accession_common::config::DEFAULT_CONFIG_FILE;
use accession_common::Config;
use accession_watch::services::{DirectoryWatcher, ManifestParser, RepositoryClient};

#[derive(Debug, Parser)]
#[command(name = "accession-watch", version, about = "Batch bundle ingest daemon")]
struct Args {
    /// Path of the configuration file
    #[arg(short = 'c', long = "config-file", default_value = DEFAULT_CONFIG_FILE)]
    config_file: PathBuf,

    /// Run one poll cycle and exit. Suitable for adding to a cronjob.
    #[arg(short = 'r', long = "run-once")]
    run_once: bool,

    /// Directory to watch, overriding the configured one
    #[arg(short = 'd', long = "directory")]
    directory: Option<PathBuf>,

    /// Seconds between directory polls, overriding the configured value
    #[arg(short = 'p', long = "poll-time")]
    poll_time: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration errors are fatal before logging exists, so they go
    // to stderr.
    let config = match Config::load(&args.config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error reading config file {}: {}", args.config_file.display(), e);
            std::process::exit(1);
        }
    };

    let _log_guard = accession_common::logging::init(&config.logging)
        .context("Failed to initialize logging")?;

    info!("Starting accession-watch");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let watch_dir = args.directory.unwrap_or(config.watcher.directory.clone());
    let poll_interval =
        Duration::from_secs(args.poll_time.unwrap_or(config.watcher.poll_seconds));

    // Fail fast on a bad endpoint or credentials before touching bundles
    let client = RepositoryClient::new(
        &config.repository.url,
        &config.repository.username,
        &config.repository.password,
    )
    .context("Failed to create repository client")?;
    if let Err(e) = client.describe().await {
        tracing::error!(url = %config.repository.url, error = %e, "Error connecting to repository");
        eprintln!("Error connecting to repository: {}", e);
        std::process::exit(1);
    }
    info!(url = %config.repository.url, "Repository connection established");

    let parser = ManifestParser::new(config.manifest.title_row);
    let watcher = match DirectoryWatcher::new(&watch_dir, parser, client, &config.repository.namespace)
    {
        Ok(watcher) => watcher,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        directory = %watch_dir.display(),
        poll_seconds = poll_interval.as_secs(),
        run_once = args.run_once,
        "Watching for bundles"
    );

    tokio::select! {
        _ = watcher.run(poll_interval, args.run_once) => {}
        _ = shutdown_signal() => {
            info!("Shutdown signal received, exiting");
        }
    }

    Ok(())
}

/// Completes on SIGINT or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}
