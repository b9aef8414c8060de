//! Manifest parsing and validation
//!
//! Reads the bundle's tabular manifest (`metadata.csv`) and produces one
//! validated [`ObjectDescriptor`] per data row, in row order. Validation
//! happens inline during the parse and aborts on the first bad row; the
//! caller treats the whole bundle as bad, never a partial descriptor list.
//!
//! Columns are positional (20 fields, fixed order) per the manifest
//! contract. Malformed CSV is reported as a format error, distinct from
//! the validation failures.

use crate::models::{ContentModel, ObjectDescriptor, Person, Relation};
use std::collections::HashSet;
use std::io::Read;
use thiserror::Error;

/// Required name of the manifest inside a bundle
pub const MANIFEST_NAME: &str = "metadata.csv";

/// Number of positional columns every data row must carry
pub const COLUMN_COUNT: usize = 20;

/// Manifest parse and validation errors
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Row is not well-formed CSV
    #[error("Manifest format error in bundle {bundle}: {source}")]
    Format {
        bundle: String,
        #[source]
        source: csv::Error,
    },

    /// Row has fewer than the required positional columns
    #[error("Metadata validation failure. Row has {got} columns, expected {COLUMN_COUNT}, in bundle {bundle}. {MANIFEST_NAME}:{line}")]
    TooFewColumns { got: usize, bundle: String, line: u64 },

    /// Referenced content file is absent from the bundle listing
    #[error("Metadata validation failure. File {file} not found in bundle {bundle}. {MANIFEST_NAME}:{line}")]
    FileNotInBundle {
        file: String,
        bundle: String,
        line: u64,
    },

    /// Relation field is present but not a 3-token triple
    #[error("Metadata validation failure. Relation '{relation}' must be 3 whitespace-separated tokens, in bundle {bundle}. {MANIFEST_NAME}:{line}")]
    MalformedRelation {
        relation: String,
        bundle: String,
        line: u64,
    },

    /// Relation subject is not one of the row's files
    #[error("Metadata validation failure. Relation subject {subject} is not among the row's files, in bundle {bundle}. {MANIFEST_NAME}:{line}")]
    RelationSubjectUnknown {
        subject: String,
        bundle: String,
        line: u64,
    },

    /// Role/first-name/last-name columns split to different lengths
    #[error("Metadata validation failure. Person fields differ in length: {roles} roles, {first_names} first names, {last_names} last names, in bundle {bundle}. {MANIFEST_NAME}:{line}")]
    PeopleLengthMismatch {
        roles: usize,
        first_names: usize,
        last_names: usize,
        bundle: String,
        line: u64,
    },

    /// Content model is not one of audio, document, image
    #[error("Metadata validation failure. Unknown content model '{value}' (expected audio, document, or image), in bundle {bundle}. {MANIFEST_NAME}:{line}")]
    UnknownContentModel {
        value: String,
        bundle: String,
        line: u64,
    },
}

/// Manifest parser
///
/// Carries the header-row flag explicitly instead of reading it from
/// global configuration.
#[derive(Debug, Clone, Copy)]
pub struct ManifestParser {
    title_row: bool,
}

impl ManifestParser {
    pub fn new(title_row: bool) -> Self {
        Self { title_row }
    }

    /// Parse the manifest into descriptors, validating each row against
    /// the bundle's file listing. Stops at the first invalid row.
    pub fn parse<R: Read>(
        &self,
        input: R,
        listing: &HashSet<String>,
        bundle: &str,
    ) -> Result<Vec<ObjectDescriptor>, ManifestError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.title_row)
            .flexible(true)
            .from_reader(input);

        let mut descriptors = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|source| ManifestError::Format {
                bundle: bundle.to_string(),
                source,
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            descriptors.push(self.parse_row(&record, line, listing, bundle)?);
        }

        Ok(descriptors)
    }

    fn parse_row(
        &self,
        record: &csv::StringRecord,
        line: u64,
        listing: &HashSet<String>,
        bundle: &str,
    ) -> Result<ObjectDescriptor, ManifestError> {
        if record.len() < COLUMN_COUNT {
            return Err(ManifestError::TooFewColumns {
                got: record.len(),
                bundle: bundle.to_string(),
                line,
            });
        }

        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();

        let files = split_multi(&field(0));
        for file in &files {
            if !listing.contains(file) {
                return Err(ManifestError::FileNotInBundle {
                    file: file.clone(),
                    bundle: bundle.to_string(),
                    line,
                });
            }
        }

        let relation = parse_relation(&field(2), &files, bundle, line)?;
        let people = parse_people(&field(8), &field(9), &field(10), bundle, line)?;

        let model_field = field(19);
        let content_model =
            model_field
                .parse::<ContentModel>()
                .map_err(|value| ManifestError::UnknownContentModel {
                    value,
                    bundle: bundle.to_string(),
                    line,
                })?;

        Ok(ObjectDescriptor {
            files,
            title: field(1),
            relation,
            subjects: split_multi(&field(3)),
            keywords: split_multi(&field(4)),
            date: field(5),
            spatial_coverage: field(6),
            temporal_coverage: field(7),
            people,
            publisher: field(11),
            language: field(12),
            rights: field(13),
            abstract_text: field(14),
            significant_passages: field(15),
            sensitive_passages: field(16),
            notes: field(17),
            collection: field(18),
            content_model,
            source_line: line,
        })
    }
}

/// Split a semicolon-delimited field, trimming entries and dropping
/// empty segments.
fn split_multi(field: &str) -> Vec<String> {
    field
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

fn parse_relation(
    field: &str,
    files: &[String],
    bundle: &str,
    line: u64,
) -> Result<Option<Relation>, ManifestError> {
    if field.is_empty() {
        return Ok(None);
    }

    let tokens: Vec<&str> = field.split_whitespace().collect();
    if tokens.len() != 3 {
        return Err(ManifestError::MalformedRelation {
            relation: field.to_string(),
            bundle: bundle.to_string(),
            line,
        });
    }

    if !files.iter().any(|f| f == tokens[0]) {
        return Err(ManifestError::RelationSubjectUnknown {
            subject: tokens[0].to_string(),
            bundle: bundle.to_string(),
            line,
        });
    }

    Ok(Some(Relation {
        subject: tokens[0].to_string(),
        predicate: tokens[1].to_string(),
        object: tokens[2].to_string(),
    }))
}

fn parse_people(
    roles: &str,
    first_names: &str,
    last_names: &str,
    bundle: &str,
    line: u64,
) -> Result<Vec<Person>, ManifestError> {
    // All three blank means no contributors at all
    if roles.is_empty() && first_names.is_empty() && last_names.is_empty() {
        return Ok(Vec::new());
    }

    // Keep empty segments so positional pairing across the three
    // parallel arrays is preserved
    let split = |s: &str| -> Vec<String> {
        s.split(';').map(|entry| entry.trim().to_string()).collect()
    };
    let roles = split(roles);
    let firsts = split(first_names);
    let lasts = split(last_names);

    if roles.len() != firsts.len() || firsts.len() != lasts.len() {
        return Err(ManifestError::PeopleLengthMismatch {
            roles: roles.len(),
            first_names: firsts.len(),
            last_names: lasts.len(),
            bundle: bundle.to_string(),
            line,
        });
    }

    Ok(roles
        .into_iter()
        .zip(firsts)
        .zip(lasts)
        .map(|((role, first_name), last_name)| Person {
            role,
            first_name,
            last_name,
        })
        .collect())
}
