//! Playback manifest builder for time-based media
//!
//! Audio objects get an RSS playlist datastream the media player loads:
//! one channel, one numbered item per content stream in file order. Items
//! reference the repository paths of the streams that the assembler is
//! about to create, plus the object's fixed `TN` thumbnail stream.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io;

const JWPLAYER_NAMESPACE: &str = "http://developer.longtailvideo.com/trac/wiki/FlashFormats";

/// Thumbnail stream id every item's image path points at
pub const THUMBNAIL_STREAM_ID: &str = "TN";

/// One playlist entry, in playback order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// 0-based position in the descriptor's file order
    pub index: usize,
    pub file_name: String,
    pub media_type: String,
    /// Datastream id the content will be stored under
    pub stream_id: String,
}

/// Render the playback-ordered playlist document for an object
pub fn build_playlist(object_id: &str, entries: &[PlaylistEntry]) -> io::Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:jwplayer", JWPLAYER_NAMESPACE));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", object_id)?;

    for entry in entries {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", &format!("Part {}", entry.index + 1))?;
        text_element(
            &mut writer,
            "jwplayer:file",
            &stream_path(object_id, &entry.stream_id),
        )?;
        text_element(&mut writer, "jwplayer:type", &entry.media_type)?;
        text_element(
            &mut writer,
            "jwplayer:image",
            &stream_path(object_id, THUMBNAIL_STREAM_ID),
        )?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Playable-content reference path for a stream of an object
fn stream_path(object_id: &str, stream_id: &str) -> String {
    format!("/fedora/repository/{}/{}", object_id, stream_id)
}

fn text_element<W: io::Write>(writer: &mut Writer<W>, name: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    if !text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))
}
