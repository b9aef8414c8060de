//! End-to-end pipeline tests
//!
//! Exercise bundle → manifest → plan → documents over real zip archives,
//! no repository involved.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use accession_watch::models::ContentModel;
use accession_watch::services::assembler::{
    plan_streams, DESCRIPTIVE_STREAM_ID, METADATA_STREAM_ID, ORIGINAL_STREAM_ID,
    PLAYLIST_STREAM_ID,
};
use accession_watch::services::{build_mods, build_playlist, Bundle, ManifestParser, PlaylistEntry};

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

const IMAGE_ROW: &str = "a.jpg,My Image,,cat,animal,2020,,,photographer,Jane,Doe,Pub,en,public,abs,,,,coll1,image\n";
const AUDIO_ROW: &str =
    "side-a.mp3;side-b.mp3,Interview,,,,1978,,,interviewer,Ada,Byrne,,,restricted,,,,,coll2,audio\n";

#[test]
fn image_bundle_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("image.zip");
    write_bundle(
        &path,
        &[
            ("metadata.csv", IMAGE_ROW.as_bytes()),
            ("a.jpg", b"JFIF".as_slice()),
        ],
    );

    let mut bundle = Bundle::open(&path).unwrap();
    let manifest = bundle.read_manifest().unwrap();
    let listing = bundle.file_names();

    let descriptors = ManifestParser::new(false)
        .parse(manifest.as_bytes(), &listing, bundle.name())
        .unwrap();
    assert_eq!(descriptors.len(), 1);

    let descriptor = &descriptors[0];
    assert_eq!(descriptor.content_model, ContentModel::Image);
    assert_eq!(descriptor.people.len(), 1);
    assert_eq!(descriptor.people[0].role, "photographer");

    // Plan: ORIGINAL content stream plus METADATA and MODS, no playlist
    let plan = plan_streams(descriptor);
    assert_eq!(plan.content.len(), 1);
    assert_eq!(plan.content[0].stream_id, ORIGINAL_STREAM_ID);
    assert_eq!(
        plan.derived,
        vec![METADATA_STREAM_ID, DESCRIPTIVE_STREAM_ID]
    );
    assert!(!plan.derived.contains(&PLAYLIST_STREAM_ID));

    // The planned file is readable from the bundle
    assert_eq!(bundle.read_file(&plan.content[0].file_name).unwrap(), b"JFIF");

    // The descriptive document renders and carries the row's values
    let mods = build_mods(descriptor).unwrap();
    assert!(mods.contains("<title>My Image</title>"));
    assert!(mods.contains("<typeOfResource>image</typeOfResource>"));
}

#[test]
fn audio_bundle_gets_ordered_playlist() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audio.zip");
    write_bundle(
        &path,
        &[
            ("metadata.csv", AUDIO_ROW.as_bytes()),
            ("side-a.mp3", b"ID3a".as_slice()),
            ("side-b.mp3", b"ID3b".as_slice()),
        ],
    );

    let mut bundle = Bundle::open(&path).unwrap();
    let manifest = bundle.read_manifest().unwrap();
    let listing = bundle.file_names();
    let descriptors = ManifestParser::new(false)
        .parse(manifest.as_bytes(), &listing, bundle.name())
        .unwrap();

    let plan = plan_streams(&descriptors[0]);
    let ids: Vec<&str> = plan.content.iter().map(|p| p.stream_id.as_str()).collect();
    assert_eq!(ids, vec!["SIDEA", "SIDEB"]);
    assert!(plan.derived.contains(&PLAYLIST_STREAM_ID));

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
    let playlist = build_playlist("demo:99", &entries).unwrap();

    let part1 = playlist.find("<title>Part 1</title>").unwrap();
    let part2 = playlist.find("<title>Part 2</title>").unwrap();
    assert!(part1 < part2);
    assert!(playlist.contains("/fedora/repository/demo:99/SIDEA"));
    assert!(playlist.contains("/fedora/repository/demo:99/SIDEB"));
    assert!(playlist.contains("/fedora/repository/demo:99/TN"));
}

#[test]
fn bundle_missing_referenced_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.zip");
    // Manifest references a.jpg but the archive only has b.jpg
    write_bundle(
        &path,
        &[
            ("metadata.csv", IMAGE_ROW.as_bytes()),
            ("b.jpg", b"JFIF".as_slice()),
        ],
    );

    let mut bundle = Bundle::open(&path).unwrap();
    let manifest = bundle.read_manifest().unwrap();
    let listing = bundle.file_names();
    let err = ManifestParser::new(false)
        .parse(manifest.as_bytes(), &listing, bundle.name())
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("a.jpg"));
    assert!(message.contains("broken.zip"));
    assert!(message.contains("metadata.csv:1"));
}
