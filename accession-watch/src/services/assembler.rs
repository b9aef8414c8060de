//! Object assembler
//!
//! Maps a validated descriptor onto a content-model choice, a set of
//! named content streams, and the creation calls against the repository.
//! Stream derivation is pure (and tested without a repository); the
//! ingest driver executes the plan with strictly sequential calls.
//!
//! A failed repository call propagates: the partially created object is
//! not rolled back, the caller abandons the bundle, and the pid appears
//! in the error log for operator follow-up.

use crate::models::{ContentModel, ObjectDescriptor};
use crate::services::bundle::{Bundle, BundleError};
use crate::services::mods::build_mods;
use crate::services::playlist::{build_playlist, PlaylistEntry};
use crate::services::repository::{
    RepositoryClient, RepositoryError, StorageMode, HAS_MODEL, IS_MEMBER_OF_COLLECTION,
};
use thiserror::Error;

/// Stream id of the primary content file for document/image objects
pub const ORIGINAL_STREAM_ID: &str = "ORIGINAL";
/// Stream id of the serialized-descriptor diagnostic stream
pub const METADATA_STREAM_ID: &str = "METADATA";
/// Stream id of the descriptive-metadata document
pub const DESCRIPTIVE_STREAM_ID: &str = "MODS";
/// Stream id of the audio playback manifest
pub const PLAYLIST_STREAM_ID: &str = "PLAYLIST";

/// Assembly errors
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("Cannot render document: {0}")]
    Document(#[from] std::io::Error),

    #[error("Cannot serialize descriptor: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// One planned content stream, in descriptor file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStream {
    pub stream_id: String,
    pub file_name: String,
    pub media_type: String,
}

/// Full stream plan for one descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPlan {
    /// Streams carrying bundle content files
    pub content: Vec<PlannedStream>,
    /// Derived document stream ids, in attach order
    pub derived: Vec<&'static str>,
}

/// Derive the stream plan for a descriptor.
///
/// Document/image objects store their first file under `ORIGINAL` and
/// subsequent files under sanitized ids. Audio objects store every file
/// under a sanitized id and additionally get a `PLAYLIST` document.
pub fn plan_streams(descriptor: &ObjectDescriptor) -> StreamPlan {
    let content = descriptor
        .files
        .iter()
        .enumerate()
        .map(|(index, file)| {
            let stream_id = if index == 0 && descriptor.content_model != ContentModel::Audio {
                ORIGINAL_STREAM_ID.to_string()
            } else {
                sanitize_stream_id(file)
            };
            PlannedStream {
                stream_id,
                file_name: file.clone(),
                media_type: guess_media_type(file),
            }
        })
        .collect();

    let derived = match descriptor.content_model {
        ContentModel::Audio => vec![PLAYLIST_STREAM_ID, METADATA_STREAM_ID, DESCRIPTIVE_STREAM_ID],
        ContentModel::Document | ContentModel::Image => {
            vec![METADATA_STREAM_ID, DESCRIPTIVE_STREAM_ID]
        }
    };

    StreamPlan { content, derived }
}

/// Derive a repository-safe stream id from a file name: the ASCII
/// alphanumerics of the stem, uppercased. Ids must be XML names, so a
/// leading digit gets a `DS` prefix; a stem with no usable characters
/// falls back to `STREAM`.
pub fn sanitize_stream_id(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);

    let id: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if id.is_empty() {
        "STREAM".to_string()
    } else if id.starts_with(|c: char| c.is_ascii_digit()) {
        format!("DS{}", id)
    } else {
        id
    }
}

/// Guess a media type from the file name
pub fn guess_media_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Executes stream plans against the repository
pub struct ObjectAssembler<'a> {
    client: &'a RepositoryClient,
    namespace: String,
}

impl<'a> ObjectAssembler<'a> {
    pub fn new(client: &'a RepositoryClient, namespace: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
        }
    }

    /// Ingest one descriptor as a fresh repository object; returns the
    /// allocated identifier.
    pub async fn ingest(
        &self,
        descriptor: &ObjectDescriptor,
        bundle: &mut Bundle,
    ) -> Result<String, AssembleError> {
        let pid = self.client.allocate_identifier(&self.namespace).await?;
        let mut object = self.client.create_object(&pid, &descriptor.title).await?;

        object.relationships.add(
            IS_MEMBER_OF_COLLECTION,
            &format!("info:fedora/{}", descriptor.collection),
        );
        object
            .relationships
            .add(HAS_MODEL, descriptor.content_model.model_uri());
        object.commit_relationships().await?;

        let plan = plan_streams(descriptor);
        for planned in &plan.content {
            let bytes = bundle.read_file(&planned.file_name)?;
            object
                .add_stream(
                    &planned.stream_id,
                    Some(&bytes),
                    &planned.media_type,
                    &planned.file_name,
                    StorageMode::Managed,
                )
                .await?;
        }

        if descriptor.content_model == ContentModel::Audio {
            let entries: Vec<PlaylistEntry> = plan
                .content
                .iter()
                .enumerate()
                .map(|(index, planned)| PlaylistEntry {
                    index,
                    file_name: planned.file_name.clone(),
                    media_type: planned.media_type.clone(),
                    stream_id: planned.stream_id.clone(),
                })
                .collect();
            let playlist = build_playlist(&pid, &entries)?;
            object
                .add_stream(
                    PLAYLIST_STREAM_ID,
                    Some(playlist.as_bytes()),
                    "application/rss+xml",
                    "Playlist",
                    StorageMode::Inline,
                )
                .await?;
        }

        let metadata = serde_json::to_vec_pretty(descriptor)?;
        object
            .add_stream(
                METADATA_STREAM_ID,
                Some(&metadata),
                "application/json",
                "Source manifest row",
                StorageMode::Managed,
            )
            .await?;

        let mods = build_mods(descriptor)?;
        object
            .add_stream(
                DESCRIPTIVE_STREAM_ID,
                Some(mods.as_bytes()),
                "text/xml",
                "Descriptive metadata",
                StorageMode::Inline,
            )
            .await?;

        tracing::info!(
            pid = %pid,
            title = %descriptor.title,
            model = %descriptor.content_model,
            streams = plan.content.len(),
            "Ingested object"
        );
        Ok(pid)
    }
}
