//! Object descriptor model
//!
//! One descriptor per manifest row. Descriptors are owned by the ingest
//! run that produced them and discarded when the run completes; they hold
//! no reference back to the source bundle beyond file names used for
//! lookup.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Content model governing stream layout and derived documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentModel {
    /// Time-based media; gets a playlist datastream
    Audio,
    Document,
    Image,
}

impl ContentModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentModel::Audio => "audio",
            ContentModel::Document => "document",
            ContentModel::Image => "image",
        }
    }

    /// Repository content-model object this model asserts via `hasModel`
    pub fn model_uri(&self) -> &'static str {
        match self {
            ContentModel::Audio => "info:fedora/islandora:sp-audioCModel",
            ContentModel::Document => "info:fedora/islandora:sp_pdf",
            ContentModel::Image => "info:fedora/islandora:sp_basic_image",
        }
    }
}

impl fmt::Display for ContentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(ContentModel::Audio),
            "document" => Ok(ContentModel::Document),
            "image" => Ok(ContentModel::Image),
            other => Err(other.to_string()),
        }
    }
}

/// One contributor: role plus name parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub role: String,
    pub first_name: String,
    pub last_name: String,
}

/// Same-bundle file-to-file relationship triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    /// Subject file; must be a member of the descriptor's `files`
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

/// Parsed and validated representation of one manifest row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectDescriptor {
    /// Content file names, first element conventionally the original
    pub files: Vec<String>,
    pub title: String,
    /// Optional relation triple; `None` when the manifest field is blank
    pub relation: Option<Relation>,
    pub subjects: Vec<String>,
    pub keywords: Vec<String>,
    pub date: String,
    pub spatial_coverage: String,
    pub temporal_coverage: String,
    pub people: Vec<Person>,
    pub publisher: String,
    pub language: String,
    pub rights: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub significant_passages: String,
    pub sensitive_passages: String,
    pub notes: String,
    /// Identifier of the parent collection object in the repository
    pub collection: String,
    pub content_model: ContentModel,
    /// 1-based line number in the manifest, for diagnostics
    pub source_line: u64,
}
