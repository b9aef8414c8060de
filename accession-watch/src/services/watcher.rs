//! Directory watcher and bundle disposition
//!
//! Polls the watch directory for `*.zip` bundles and processes each one
//! fully before the next: parse and validate the manifest, ingest every
//! described object, then move the archive. One bad bundle never stops
//! the poll loop.
//!
//! Disposition rules:
//! - archive cannot be opened (still uploading, corrupt): leave in place,
//!   retry next cycle, debug log only;
//! - manifest absent or invalid, or a repository call fails mid-ingest:
//!   error log, move to `BAD/`;
//! - everything ingested: info log, move to `complete/`.

use crate::services::assembler::ObjectAssembler;
use crate::services::bundle::Bundle;
use crate::services::manifest::ManifestParser;
use crate::services::repository::RepositoryClient;
use accession_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Subdirectory rejected bundles are moved to
pub const BAD_DIRECTORY: &str = "BAD";
/// Subdirectory ingested bundles are moved to
pub const COMPLETE_DIRECTORY: &str = "complete";

/// What to do with a bundle after one processing attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Fully ingested; move to the complete directory
    Complete,
    /// Rejected; move to the bad directory for operator inspection
    Bad,
    /// Unreadable right now; leave in place for the next poll
    Retry,
}

/// Sequential bundle poll loop
pub struct DirectoryWatcher {
    watch_dir: PathBuf,
    bad_dir: PathBuf,
    complete_dir: PathBuf,
    parser: ManifestParser,
    client: RepositoryClient,
    namespace: String,
}

impl DirectoryWatcher {
    /// Create the watcher, ensuring the bad/complete directories exist.
    /// A missing watch directory is a startup error.
    pub fn new(
        watch_dir: &Path,
        parser: ManifestParser,
        client: RepositoryClient,
        namespace: &str,
    ) -> Result<Self> {
        if !watch_dir.is_dir() {
            return Err(Error::Config(format!(
                "Directory \"{}\" does not exist or is not a directory",
                watch_dir.display()
            )));
        }

        let bad_dir = watch_dir.join(BAD_DIRECTORY);
        let complete_dir = watch_dir.join(COMPLETE_DIRECTORY);
        std::fs::create_dir_all(&bad_dir)?;
        std::fs::create_dir_all(&complete_dir)?;

        Ok(Self {
            watch_dir: watch_dir.to_path_buf(),
            bad_dir,
            complete_dir,
            parser,
            client,
            namespace: namespace.to_string(),
        })
    }

    /// Run the poll loop. With `run_once` a single cycle is executed
    /// immediately and the loop exits (cron mode); otherwise the loop
    /// sleeps the poll interval before every cycle, like the original
    /// watcher.
    pub async fn run(&self, poll_interval: Duration, run_once: bool) {
        loop {
            if !run_once {
                tokio::time::sleep(poll_interval).await;
            }
            self.poll_cycle().await;
            if run_once {
                break;
            }
        }
    }

    /// Process every bundle currently in the watch directory
    pub async fn poll_cycle(&self) {
        let bundles = match self.scan_bundles() {
            Ok(bundles) => bundles,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot scan watch directory");
                return;
            }
        };
        tracing::debug!(bundles = bundles.len(), "Poll cycle");

        for path in bundles {
            let disposition = self.process_bundle(&path).await;
            self.dispose(&path, disposition);
        }
    }

    /// Bundle archives currently in the watch directory, in name order
    fn scan_bundles(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut bundles: Vec<PathBuf> = std::fs::read_dir(&self.watch_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .map(|ext| ext.eq_ignore_ascii_case("zip"))
                        .unwrap_or(false)
            })
            .collect();
        bundles.sort();
        Ok(bundles)
    }

    async fn process_bundle(&self, path: &Path) -> Disposition {
        let mut bundle = match Bundle::open(path) {
            Ok(bundle) => bundle,
            Err(e) => {
                // Common case: archive still being uploaded when polled
                tracing::debug!(error = %e, "Cannot open bundle, will retry next poll");
                return Disposition::Retry;
            }
        };

        let manifest = match bundle.read_manifest() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("{}", e);
                return Disposition::Bad;
            }
        };

        let listing = bundle.file_names();
        let descriptors = match self.parser.parse(manifest.as_bytes(), &listing, bundle.name()) {
            Ok(descriptors) => descriptors,
            Err(e) => {
                tracing::error!("{}", e);
                return Disposition::Bad;
            }
        };

        // Objects are created independently; a failure abandons the
        // bundle but does not undo objects already created from it.
        let assembler = ObjectAssembler::new(&self.client, &self.namespace);
        for descriptor in &descriptors {
            if let Err(e) = assembler.ingest(descriptor, &mut bundle).await {
                tracing::error!(
                    bundle = %bundle.name(),
                    line = descriptor.source_line,
                    error = %e,
                    "Ingest failed, abandoning bundle"
                );
                return Disposition::Bad;
            }
        }

        tracing::info!(
            bundle = %bundle.name(),
            objects = descriptors.len(),
            "Completed processing bundle"
        );
        Disposition::Complete
    }

    fn dispose(&self, path: &Path, disposition: Disposition) {
        let destination_dir = match disposition {
            Disposition::Retry => return,
            Disposition::Bad => &self.bad_dir,
            Disposition::Complete => &self.complete_dir,
        };

        let Some(file_name) = path.file_name() else {
            return;
        };
        let destination = destination_dir.join(file_name);
        if let Err(e) = std::fs::rename(path, &destination) {
            tracing::error!(
                from = %path.display(),
                to = %destination.display(),
                error = %e,
                "Cannot move bundle"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::manifest::MANIFEST_NAME;
    use std::fs::File;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn watcher(watch_dir: &Path) -> DirectoryWatcher {
        let client = RepositoryClient::new("http://localhost:1/fedora", "user", "pass").unwrap();
        DirectoryWatcher::new(watch_dir, ManifestParser::new(false), client, "demo").unwrap()
    }

    fn write_bundle(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, bytes) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_new_creates_disposition_directories() {
        let dir = tempfile::tempdir().unwrap();
        let _watcher = watcher(dir.path());
        assert!(dir.path().join(BAD_DIRECTORY).is_dir());
        assert!(dir.path().join(COMPLETE_DIRECTORY).is_dir());
    }

    #[test]
    fn test_missing_watch_directory_is_startup_error() {
        let client = RepositoryClient::new("http://localhost:1/fedora", "user", "pass").unwrap();
        let result = DirectoryWatcher::new(
            Path::new("/nonexistent/watch"),
            ManifestParser::new(false),
            client,
            "demo",
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_scan_only_zip_files() {
        let dir = tempfile::tempdir().unwrap();
        let w = watcher(dir.path());
        std::fs::write(dir.path().join("b.zip"), b"x").unwrap();
        std::fs::write(dir.path().join("a.zip"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let bundles = w.scan_bundles().unwrap();
        let names: Vec<_> = bundles
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.zip", "b.zip"]);
    }

    #[tokio::test]
    async fn test_unreadable_bundle_left_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let w = watcher(dir.path());
        let path = dir.path().join("partial.zip");
        std::fs::write(&path, b"PK\x03\x04still uploading").unwrap();

        w.poll_cycle().await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_bundle_without_manifest_moved_to_bad() {
        let dir = tempfile::tempdir().unwrap();
        let w = watcher(dir.path());
        let path = dir.path().join("nomanifest.zip");
        write_bundle(&path, &[("a.jpg", b"JFIF".as_slice())]);

        w.poll_cycle().await;
        assert!(!path.exists());
        assert!(dir.path().join(BAD_DIRECTORY).join("nomanifest.zip").exists());
    }

    #[tokio::test]
    async fn test_invalid_manifest_moved_to_bad() {
        let dir = tempfile::tempdir().unwrap();
        let w = watcher(dir.path());
        let path = dir.path().join("badrow.zip");
        let row = "missing.jpg,T,,,,,,,,,,,,,,,,,coll1,image\n";
        write_bundle(
            &path,
            &[(MANIFEST_NAME, row.as_bytes()), ("a.jpg", b"JFIF".as_slice())],
        );

        w.poll_cycle().await;
        assert!(!path.exists());
        assert!(dir.path().join(BAD_DIRECTORY).join("badrow.zip").exists());
    }

    #[tokio::test]
    async fn test_unknown_model_moved_to_bad() {
        let dir = tempfile::tempdir().unwrap();
        let w = watcher(dir.path());
        let path = dir.path().join("video.zip");
        let row = "a.jpg,T,,,,,,,,,,,,,,,,,coll1,video\n";
        write_bundle(
            &path,
            &[(MANIFEST_NAME, row.as_bytes()), ("a.jpg", b"JFIF".as_slice())],
        );

        w.poll_cycle().await;
        assert!(dir.path().join(BAD_DIRECTORY).join("video.zip").exists());
    }
}
