//! Service modules for the bundle ingest pipeline
//!
//! Control flow: watcher → bundle → manifest → assembler, with the MODS
//! and playlist builders invoked by the assembler per descriptor.

pub mod assembler;
pub mod bundle;
pub mod manifest;
pub mod mods;
pub mod playlist;
pub mod repository;
pub mod watcher;

pub use assembler::{plan_streams, sanitize_stream_id, AssembleError, ObjectAssembler, StreamPlan};
pub use bundle::{Bundle, BundleError};
pub use manifest::{ManifestError, ManifestParser, MANIFEST_NAME};
pub use mods::build_mods;
pub use playlist::{build_playlist, PlaylistEntry};
pub use repository::{RepositoryClient, RepositoryError, StorageMode};
pub use watcher::{DirectoryWatcher, Disposition};
