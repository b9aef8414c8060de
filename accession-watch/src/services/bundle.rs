//! Bundle archive handle
//!
//! A bundle is a single flat zip archive containing `metadata.csv` plus
//! every content file the manifest references. Files are read by name on
//! demand; the archive handle is scoped to one bundle's processing and
//! dropped on every exit path.
//!
//! An archive that cannot be opened is the retryable failure class: the
//! common cause is a bundle still being written when the poll fires.

use crate::services::manifest::MANIFEST_NAME;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

/// Bundle access errors
#[derive(Debug, Error)]
pub enum BundleError {
    /// Archive cannot be opened or is incomplete; retry on the next poll
    #[error("Cannot open bundle {bundle}: {reason}")]
    Unreadable { bundle: String, reason: String },

    /// Archive is readable but carries no manifest
    #[error("Bundle {bundle} doesn't contain {MANIFEST_NAME}")]
    MissingManifest { bundle: String },

    /// Named file cannot be read out of the archive
    #[error("Cannot read {file} from bundle {bundle}: {reason}")]
    FileRead {
        file: String,
        bundle: String,
        reason: String,
    },
}

/// Open bundle archive
#[derive(Debug)]
pub struct Bundle {
    archive: ZipArchive<File>,
    name: String,
}

impl Bundle {
    /// Open the archive at `path`. The bundle's display name for
    /// diagnostics is the path's file name.
    pub fn open(path: &Path) -> Result<Self, BundleError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let file = File::open(path).map_err(|e| BundleError::Unreadable {
            bundle: name.clone(),
            reason: e.to_string(),
        })?;
        let archive = ZipArchive::new(file).map_err(|e| BundleError::Unreadable {
            bundle: name.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self { archive, name })
    }

    /// Bundle display name for diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of all entries in the archive
    pub fn file_names(&self) -> HashSet<String> {
        self.archive.file_names().map(String::from).collect()
    }

    /// Read one named entry's bytes
    pub fn read_file(&mut self, file: &str) -> Result<Vec<u8>, BundleError> {
        let name = self.name.clone();
        let mut entry = self.archive.by_name(file).map_err(|e| BundleError::FileRead {
            file: file.to_string(),
            bundle: name.clone(),
            reason: e.to_string(),
        })?;

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| BundleError::FileRead {
                file: file.to_string(),
                bundle: name,
                reason: e.to_string(),
            })?;
        Ok(bytes)
    }

    /// Read the manifest text; its absence is a structural failure, not
    /// a retryable one.
    pub fn read_manifest(&mut self) -> Result<String, BundleError> {
        let name = self.name.clone();
        match self.archive.by_name(MANIFEST_NAME) {
            Ok(mut entry) => {
                let mut text = String::new();
                entry
                    .read_to_string(&mut text)
                    .map_err(|e| BundleError::FileRead {
                        file: MANIFEST_NAME.to_string(),
                        bundle: name,
                        reason: e.to_string(),
                    })?;
                Ok(text)
            }
            Err(ZipError::FileNotFound) => Err(BundleError::MissingManifest { bundle: name }),
            Err(e) => Err(BundleError::FileRead {
                file: MANIFEST_NAME.to_string(),
                bundle: name,
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

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
    fn test_open_listing_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.zip");
        write_bundle(
            &path,
            &[(MANIFEST_NAME, b"row".as_slice()), ("a.jpg", b"JFIF".as_slice())],
        );

        let mut bundle = Bundle::open(&path).unwrap();
        assert_eq!(bundle.name(), "batch.zip");
        let names = bundle.file_names();
        assert!(names.contains(MANIFEST_NAME));
        assert!(names.contains("a.jpg"));
        assert_eq!(bundle.read_file("a.jpg").unwrap(), b"JFIF");
        assert_eq!(bundle.read_manifest().unwrap(), "row");
    }

    #[test]
    fn test_missing_manifest_is_structural() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.zip");
        write_bundle(&path, &[("a.jpg", b"JFIF".as_slice())]);

        let mut bundle = Bundle::open(&path).unwrap();
        assert!(matches!(
            bundle.read_manifest().unwrap_err(),
            BundleError::MissingManifest { .. }
        ));
    }

    #[test]
    fn test_truncated_archive_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.zip");
        // Bytes of a zip still being uploaded
        std::fs::write(&path, b"PK\x03\x04truncated").unwrap();

        assert!(matches!(
            Bundle::open(&path).unwrap_err(),
            BundleError::Unreadable { .. }
        ));
    }

    #[test]
    fn test_read_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.zip");
        write_bundle(&path, &[(MANIFEST_NAME, b"".as_slice())]);

        let mut bundle = Bundle::open(&path).unwrap();
        assert!(matches!(
            bundle.read_file("gone.wav").unwrap_err(),
            BundleError::FileRead { .. }
        ));
    }
}
