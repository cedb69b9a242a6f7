//! Round-trip tests: create an archive from a directory tree, extract it,
//! and compare the result with the original.

mod common;

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use zipvault::{
    ArchiveReader, CompressionMethod, EntrySource, ErrorKind, ExtractOptions, WriteOptions,
};

use common::{random_bytes, read_tree, text_bytes, write_tree};

fn sample_tree(root: &Path) {
    write_tree(
        root,
        &[
            ("readme.txt", &text_bytes(10_000)),
            ("data/blob.bin", &random_bytes(50_000, 1)),
            ("data/nested/deep.txt", b"deep"),
            ("empty.txt", b""),
        ],
    );
    fs::create_dir_all(root.join("data/empty_dir")).unwrap();
}

fn roundtrip(options: &WriteOptions, extract: &ExtractOptions) {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("project");
    sample_tree(&source);

    let result = zipvault::create_archive(&source, "", true, options).unwrap();
    assert_eq!(result.archive_path, temp.path().join("project.zip"));
    assert_eq!(result.entries_written, 4);
    assert_eq!(result.directories_written, 3);

    let out = temp.path().join("out");
    zipvault::extract(&result.archive_path, &out, extract).unwrap();

    assert_eq!(read_tree(&out), read_tree(&source));
    assert!(out.join("data/empty_dir").is_dir());
}

#[test]
fn test_roundtrip_deflate() {
    roundtrip(&WriteOptions::new(), &ExtractOptions::new());
}

#[test]
fn test_roundtrip_stored() {
    let options = WriteOptions::new().method(CompressionMethod::Stored);
    roundtrip(&options, &ExtractOptions::new());
}

#[test]
fn test_roundtrip_encrypted() {
    let options = WriteOptions::new().passphrase("correct horse");
    roundtrip(&options, &ExtractOptions::new().passphrase("correct horse"));
}

#[test]
fn test_roundtrip_all_levels() {
    for level in [0, 1, 9] {
        let options = WriteOptions::new().level(level).unwrap();
        roundtrip(&options, &ExtractOptions::new());
    }
}

#[test]
fn test_single_file_source() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("notes.txt");
    fs::write(&source, b"just one file").unwrap();

    let out_dir = temp.path().join("archives");
    fs::create_dir(&out_dir).unwrap();
    let result = zipvault::create_archive(&source, &out_dir, false, &WriteOptions::new()).unwrap();
    assert_eq!(result.archive_path, out_dir.join("notes.zip"));

    let reader = ArchiveReader::open(&result.archive_path).unwrap();
    assert_eq!(reader.entry_paths(), vec!["notes.txt"]);
}

#[test]
fn test_explicit_destination_is_used_verbatim() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src");
    write_tree(&source, &[("a.txt", b"a")]);

    let destination = temp.path().join("new/parent/custom.zip");
    let result =
        zipvault::create_archive(&source, &destination, true, &WriteOptions::new()).unwrap();
    assert_eq!(result.archive_path, destination);
    assert!(destination.is_file());
    assert!(!temp.path().join("new/parent/custom.zip.partial").exists());
}

#[test]
fn test_empty_directory_source() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("nothing");
    fs::create_dir(&source).unwrap();

    let result = zipvault::create_archive(&source, "", true, &WriteOptions::new()).unwrap();
    assert_eq!(result.entries_written, 0);

    let reader = ArchiveReader::open(&result.archive_path).unwrap();
    assert!(reader.is_empty());
}

#[test]
fn test_nonexistent_source_is_invalid_argument() {
    let temp = TempDir::new().unwrap();
    let err = zipvault::create_archive(
        temp.path().join("missing"),
        "",
        true,
        &WriteOptions::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_comments_survive() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("c");
    write_tree(&source, &[("x.txt", b"x")]);

    let options = WriteOptions::new()
        .comment("nightly build")
        .entry_comment("generated");
    let result = zipvault::create_archive(&source, "", true, &options).unwrap();

    let reader = ArchiveReader::open(&result.archive_path).unwrap();
    assert_eq!(reader.comment(), "nightly build");
    assert_eq!(reader.entry_comments(), vec![("x.txt", "generated")]);
}

#[test]
fn test_unicode_names() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("intl");
    write_tree(&source, &[("日本語.txt", b"konnichiwa"), ("café/menu.txt", b"menu")]);

    let result = zipvault::create_archive(&source, "", true, &WriteOptions::new()).unwrap();
    let out = temp.path().join("out");
    zipvault::extract(&result.archive_path, &out, &ExtractOptions::new()).unwrap();
    assert_eq!(read_tree(&out), read_tree(&source));
}

#[test]
fn test_multiple_sources() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first");
    let second = temp.path().join("second.txt");
    write_tree(&first, &[("one.txt", b"1")]);
    fs::write(&second, b"2").unwrap();

    let sources = [
        EntrySource::local(&first, true).unwrap(),
        EntrySource::local(&second, true).unwrap(),
    ];
    let result = zipvault::create_archive_from(&sources, "", &WriteOptions::new()).unwrap();
    assert_eq!(result.archive_path, temp.path().join("first.zip"));

    let reader = ArchiveReader::open(&result.archive_path).unwrap();
    assert_eq!(reader.entry_paths(), vec!["one.txt", "second.txt"]);
}

#[test]
fn test_extract_all() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    write_tree(&a, &[("from_a.txt", b"A")]);
    write_tree(&b, &[("from_b.txt", b"B")]);

    let archive_a = zipvault::create_archive(&a, "", true, &WriteOptions::new())
        .unwrap()
        .archive_path;
    let archive_b = zipvault::create_archive(&b, "", true, &WriteOptions::new())
        .unwrap()
        .archive_path;

    let out = temp.path().join("out");
    let results = zipvault::extract_all(&[&archive_a, &archive_b], &out, &ExtractOptions::new())
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(fs::read(out.join("from_a.txt")).unwrap(), b"A");
    assert_eq!(fs::read(out.join("from_b.txt")).unwrap(), b"B");
}

#[test]
fn test_delete_archive_on_success() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("gone");
    write_tree(&source, &[("x.txt", b"x")]);
    let archive = zipvault::create_archive(&source, "", true, &WriteOptions::new())
        .unwrap()
        .archive_path;

    let options = ExtractOptions::new().delete_archive_on_success(true);
    let result = zipvault::extract(&archive, temp.path().join("out"), &options).unwrap();
    assert!(result.archive_deleted);
    assert!(!archive.exists());
}

#[test]
fn test_modified_time_restored() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("times");
    write_tree(&source, &[("old.txt", b"old")]);
    let old = std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000_000);
    filetime::set_file_mtime(
        source.join("old.txt"),
        filetime::FileTime::from_system_time(old),
    )
    .unwrap();

    let archive = zipvault::create_archive(&source, "", true, &WriteOptions::new())
        .unwrap()
        .archive_path;
    let out = temp.path().join("out");
    zipvault::extract(&archive, &out, &ExtractOptions::new()).unwrap();

    let restored = fs::metadata(out.join("old.txt")).unwrap().modified().unwrap();
    let drift = restored
        .duration_since(old)
        .unwrap_or_else(|e| e.duration());
    // DOS timestamps have two-second resolution
    assert!(drift.as_secs() < 2, "drift {drift:?}");
}

#[test]
fn test_is_valid_archive() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("v");
    write_tree(&source, &[("x.txt", b"x")]);
    let archive = zipvault::create_archive(&source, "", true, &WriteOptions::new())
        .unwrap()
        .archive_path;

    assert!(zipvault::is_valid_archive(&archive));
    assert!(!zipvault::is_valid_archive(source.join("x.txt")));
    assert!(!zipvault::is_valid_archive(temp.path().join("nope.zip")));
}
