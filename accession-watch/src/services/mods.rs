//! Descriptive-metadata (MODS) document builder
//!
//! Renders one MODS 3.4 document per descriptor. Empty field values
//! produce empty elements rather than omitted ones; downstream display
//! tooling keys off element presence.

use crate::models::ObjectDescriptor;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io;

const MODS_NAMESPACE: &str = "http://www.loc.gov/mods/v3";

/// Render the descriptive-metadata document for a descriptor
pub fn build_mods(descriptor: &ObjectDescriptor) -> io::Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("mods");
    root.push_attribute(("xmlns", MODS_NAMESPACE));
    root.push_attribute(("version", "3.4"));
    writer.write_event(Event::Start(root))?;

    // Title
    nested(&mut writer, "titleInfo", |w| {
        text_element(w, "title", &[], &descriptor.title)
    })?;

    // One subject/topic per subject value, then per keyword
    for topic in descriptor.subjects.iter().chain(&descriptor.keywords) {
        nested(&mut writer, "subject", |w| text_element(w, "topic", &[], topic))?;
    }

    // Creation date
    nested(&mut writer, "originInfo", |w| {
        text_element(w, "dateCreated", &[], &descriptor.date)
    })?;

    // Coverage
    nested(&mut writer, "subject", |w| {
        text_element(w, "geographic", &[], &descriptor.spatial_coverage)
    })?;
    nested(&mut writer, "subject", |w| {
        text_element(w, "temporal", &[], &descriptor.temporal_coverage)
    })?;

    // Contributors
    for person in &descriptor.people {
        let mut name = BytesStart::new("name");
        name.push_attribute(("type", "personal"));
        writer.write_event(Event::Start(name))?;
        nested(&mut writer, "role", |w| {
            text_element(w, "roleTerm", &[("type", "text")], &person.role)
        })?;
        text_element(&mut writer, "namePart", &[("type", "family")], &person.last_name)?;
        text_element(&mut writer, "namePart", &[("type", "given")], &person.first_name)?;
        writer.write_event(Event::End(BytesEnd::new("name")))?;
    }

    // Publisher
    nested(&mut writer, "originInfo", |w| {
        text_element(w, "publisher", &[], &descriptor.publisher)
    })?;

    // Rights
    text_element(
        &mut writer,
        "accessCondition",
        &[("type", "use and reproduction")],
        &descriptor.rights,
    )?;

    // Language
    nested(&mut writer, "language", |w| {
        text_element(w, "languageTerm", &[("type", "text")], &descriptor.language)
    })?;

    text_element(&mut writer, "abstract", &[], &descriptor.abstract_text)?;

    // Notes: one general, two labeled
    text_element(&mut writer, "note", &[], &descriptor.notes)?;
    text_element(
        &mut writer,
        "note",
        &[("displayLabel", "Significant Passages")],
        &descriptor.significant_passages,
    )?;
    text_element(
        &mut writer,
        "note",
        &[("displayLabel", "Sensitive Passages")],
        &descriptor.sensitive_passages,
    )?;

    text_element(
        &mut writer,
        "typeOfResource",
        &[],
        descriptor.content_model.as_str(),
    )?;

    writer.write_event(Event::End(BytesEnd::new("mods")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn text_element<W: io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    attributes: &[(&str, &str)],
    text: &str,
) -> io::Result<()> {
    let mut start = BytesStart::new(name);
    for attribute in attributes {
        start.push_attribute(*attribute);
    }
    writer.write_event(Event::Start(start))?;
    if !text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))
}

fn nested<W, F>(writer: &mut Writer<W>, name: &str, inner: F) -> io::Result<()>
where
    W: io::Write,
    F: FnOnce(&mut Writer<W>) -> io::Result<()>,
{
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    inner(writer)?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}
