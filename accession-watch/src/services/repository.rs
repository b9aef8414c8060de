//! Repository REST client
//!
//! Narrow client over the repository's management API: identifier
//! allocation, object creation, datastream attachment, and relationship
//! assertion. Relationships accumulate on the object handle and are only
//! written out by an explicit commit, which serializes them as an inline
//! `RELS-EXT` RDF/XML datastream.
//!
//! Requests carry no timeout: a hung repository call blocks the single
//! control thread, and bundle processing is strictly sequential anyway.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use reqwest::StatusCode;
use std::io;
use thiserror::Error;

const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const RELATION_NAMESPACE: &str = "info:fedora/fedora-system:def/relations-external#";
const MODEL_NAMESPACE: &str = "info:fedora/fedora-system:def/model#";

/// Datastream id relationships are committed under
pub const RELATIONSHIP_STREAM_ID: &str = "RELS-EXT";

/// Collection-membership relationship predicate
pub const IS_MEMBER_OF_COLLECTION: &str = "isMemberOfCollection";
/// Content-model relationship predicate
pub const HAS_MODEL: &str = "hasModel";

/// Repository client errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication rejected by repository")]
    Unauthorized,

    #[error("Repository API error {0}: {1}")]
    Api(u16, String),

    #[error("Cannot parse repository response: {0}")]
    Parse(String),
}

/// How the repository stores an attached content stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Repository-managed binary content
    Managed,
    /// Inline XML stored in the object record
    Inline,
}

impl StorageMode {
    fn control_group(&self) -> &'static str {
        match self {
            StorageMode::Managed => "M",
            StorageMode::Inline => "X",
        }
    }
}

/// Repository REST client; one per process, reused across bundles
pub struct RepositoryClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl RepositoryClient {
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self, RepositoryError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RepositoryError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Connectivity probe used at startup to fail fast on a bad
    /// endpoint or bad credentials.
    pub async fn describe(&self) -> Result<(), RepositoryError> {
        let url = format!("{}/describe", self.base_url);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;
        expect_success(response).await.map(|_| ())
    }

    /// Request a fresh persistent identifier scoped to `namespace`
    pub async fn allocate_identifier(&self, namespace: &str) -> Result<String, RepositoryError> {
        let url = format!("{}/objects/nextPID", self.base_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("namespace", namespace), ("format", "xml")])
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;

        let body = expect_success(response).await?;
        let pid = parse_next_pid(&body)?;
        tracing::debug!(pid = %pid, namespace = %namespace, "Allocated identifier");
        Ok(pid)
    }

    /// Create a repository object and return its handle
    pub async fn create_object(
        &self,
        pid: &str,
        label: &str,
    ) -> Result<RepositoryObject<'_>, RepositoryError> {
        let url = format!("{}/objects/{}", self.base_url, pid);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("label", label)])
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;
        expect_success(response).await?;

        tracing::debug!(pid = %pid, label = %label, "Created repository object");
        Ok(RepositoryObject {
            client: self,
            pid: pid.to_string(),
            relationships: RelationshipSet::new(),
        })
    }
}

/// Handle to a created repository object
pub struct RepositoryObject<'a> {
    client: &'a RepositoryClient,
    pid: String,
    /// Pending relationship assertions; written by `commit_relationships`
    pub relationships: RelationshipSet,
}

impl RepositoryObject<'_> {
    pub fn pid(&self) -> &str {
        &self.pid
    }

    /// Attach a named, typed content stream. `content` may be `None` for
    /// streams the repository populates itself.
    pub async fn add_stream(
        &self,
        stream_id: &str,
        content: Option<&[u8]>,
        media_type: &str,
        label: &str,
        mode: StorageMode,
    ) -> Result<(), RepositoryError> {
        let url = format!(
            "{}/objects/{}/datastreams/{}",
            self.client.base_url, self.pid, stream_id
        );
        let mut request = self
            .client
            .http
            .post(&url)
            .basic_auth(&self.client.username, Some(&self.client.password))
            .query(&[
                ("controlGroup", mode.control_group()),
                ("dsLabel", label),
                ("mimeType", media_type),
            ])
            .header(reqwest::header::CONTENT_TYPE, media_type);
        if let Some(bytes) = content {
            request = request.body(bytes.to_vec());
        }

        let response = request
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;
        expect_success(response).await?;

        tracing::debug!(pid = %self.pid, stream = %stream_id, media_type = %media_type, "Attached content stream");
        Ok(())
    }

    /// Write the accumulated relationships as the object's `RELS-EXT`
    /// inline datastream.
    pub async fn commit_relationships(&self) -> Result<(), RepositoryError> {
        let rdf = self
            .relationships
            .to_rdf_xml(&self.pid)
            .map_err(|e| RepositoryError::Parse(e.to_string()))?;
        self.add_stream(
            RELATIONSHIP_STREAM_ID,
            Some(rdf.as_bytes()),
            "application/rdf+xml",
            "Relationships",
            StorageMode::Inline,
        )
        .await
    }
}

/// Appendable mapping of relationship predicate to target object
#[derive(Debug, Default, Clone)]
pub struct RelationshipSet {
    entries: Vec<(String, String)>,
}

impl RelationshipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an assertion; `target` is a repository object URI such as
    /// `info:fedora/demo:collection`.
    pub fn add(&mut self, predicate: &str, target: &str) {
        self.entries.push((predicate.to_string(), target.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as the RDF/XML document the repository expects
    pub fn to_rdf_xml(&self, pid: &str) -> io::Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("rdf:RDF");
        root.push_attribute(("xmlns:rdf", RDF_NAMESPACE));
        root.push_attribute(("xmlns:fedora", RELATION_NAMESPACE));
        root.push_attribute(("xmlns:fedora-model", MODEL_NAMESPACE));
        writer.write_event(Event::Start(root))?;

        let mut description = BytesStart::new("rdf:Description");
        description.push_attribute(("rdf:about", format!("info:fedora/{}", pid).as_str()));
        writer.write_event(Event::Start(description))?;

        for (predicate, target) in &self.entries {
            let name = format!("{}:{}", predicate_prefix(predicate), predicate);
            let mut element = BytesStart::new(name.as_str());
            element.push_attribute(("rdf:resource", target.as_str()));
            writer.write_event(Event::Empty(element))?;
        }

        writer.write_event(Event::End(BytesEnd::new("rdf:Description")))?;
        writer.write_event(Event::End(BytesEnd::new("rdf:RDF")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Model assertions live in the system model namespace; everything else
/// is an external relation.
fn predicate_prefix(predicate: &str) -> &'static str {
    if predicate == HAS_MODEL {
        "fedora-model"
    } else {
        "fedora"
    }
}

async fn expect_success(response: reqwest::Response) -> Result<String, RepositoryError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(RepositoryError::Unauthorized);
    }
    let body = response
        .text()
        .await
        .map_err(|e| RepositoryError::Network(e.to_string()))?;
    if !status.is_success() {
        return Err(RepositoryError::Api(status.as_u16(), body));
    }
    Ok(body)
}

/// Pull the allocated pid out of the nextPID XML response
fn parse_next_pid(xml: &str) -> Result<String, RepositoryError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut in_pid = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"pid" => in_pid = true,
            Ok(Event::Text(t)) if in_pid => {
                let pid = t
                    .unescape()
                    .map_err(|e| RepositoryError::Parse(e.to_string()))?
                    .trim()
                    .to_string();
                if pid.is_empty() {
                    return Err(RepositoryError::Parse("empty pid in response".to_string()));
                }
                return Ok(pid);
            }
            Ok(Event::Eof) => {
                return Err(RepositoryError::Parse("no pid in response".to_string()))
            }
            Ok(_) => {}
            Err(e) => return Err(RepositoryError::Parse(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next_pid() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <pidList xmlns="http://www.fedora.info/definitions/1/0/management/">
              <pid>demo:42</pid>
            </pidList>"#;
        assert_eq!(parse_next_pid(xml).unwrap(), "demo:42");
    }

    #[test]
    fn test_parse_next_pid_missing() {
        let xml = r#"<pidList></pidList>"#;
        assert!(matches!(
            parse_next_pid(xml).unwrap_err(),
            RepositoryError::Parse(_)
        ));
    }

    #[test]
    fn test_relationship_serialization() {
        let mut set = RelationshipSet::new();
        set.add(IS_MEMBER_OF_COLLECTION, "info:fedora/demo:collection");
        set.add(HAS_MODEL, "info:fedora/islandora:sp-audioCModel");

        let rdf = set.to_rdf_xml("demo:42").unwrap();
        assert!(rdf.contains("rdf:about=\"info:fedora/demo:42\""));
        assert!(rdf.contains(
            "<fedora:isMemberOfCollection rdf:resource=\"info:fedora/demo:collection\"/>"
        ));
        assert!(rdf.contains(
            "<fedora-model:hasModel rdf:resource=\"info:fedora/islandora:sp-audioCModel\"/>"
        ));
    }

    #[test]
    fn test_relationship_set_starts_empty() {
        let set = RelationshipSet::new();
        assert!(set.is_empty());
        let rdf = set.to_rdf_xml("demo:1").unwrap();
        assert!(rdf.contains("rdf:Description"));
    }

    #[test]
    fn test_storage_mode_control_groups() {
        assert_eq!(StorageMode::Managed.control_group(), "M");
        assert_eq!(StorageMode::Inline.control_group(), "X");
    }
}
