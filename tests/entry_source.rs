//! Tests for flat and structured entry sources.

mod common;

use std::fs;

use tempfile::TempDir;
use zipvault::{
    ArchiveReader, EntrySource, ErrorKind, ExtractOptions, MemoryFileSystem, WriteOptions,
};

use common::{file_names, write_tree};

fn root_with_subdir(temp: &TempDir) -> std::path::PathBuf {
    let root = temp.path().join("root");
    write_tree(&root, &[("a.txt", b"a"), ("sub/b.txt", b"b")]);
    root
}

#[test]
fn test_flat_mode_excludes_subdirectories() {
    let temp = TempDir::new().unwrap();
    let root = root_with_subdir(&temp);

    let result = zipvault::create_archive(&root, "", false, &WriteOptions::new()).unwrap();
    let reader = ArchiveReader::open(&result.archive_path).unwrap();
    assert_eq!(reader.entry_paths(), vec!["a.txt"]);

    let out = temp.path().join("out");
    zipvault::extract(&result.archive_path, &out, &ExtractOptions::new()).unwrap();
    assert_eq!(file_names(&out), ["a.txt"]);
}

#[test]
fn test_structured_mode_keeps_paths() {
    let temp = TempDir::new().unwrap();
    let root = root_with_subdir(&temp);

    let result = zipvault::create_archive(&root, "", true, &WriteOptions::new()).unwrap();
    let reader = ArchiveReader::open(&result.archive_path).unwrap();
    assert_eq!(reader.entry_paths(), vec!["a.txt", "sub/", "sub/b.txt"]);

    let out = temp.path().join("out");
    zipvault::extract(&result.archive_path, &out, &ExtractOptions::new()).unwrap();
    assert_eq!(fs::read(out.join("sub/b.txt")).unwrap(), b"b");
}

#[test]
fn test_source_classification() {
    let temp = TempDir::new().unwrap();
    let root = root_with_subdir(&temp);

    let dir = EntrySource::local(&root, true).unwrap();
    assert!(dir.is_directory());
    assert_eq!(dir.name().unwrap(), "root");

    let file = EntrySource::local(root.join("a.txt"), false).unwrap();
    assert!(!file.is_directory());
    assert_eq!(file.name().unwrap(), "a");

    let err = EntrySource::local(temp.path().join("missing"), true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_deep_tree_in_memory() {
    let fs = MemoryFileSystem::new();
    let mut path = String::from("/deep");
    for i in 0..200 {
        path.push_str(&format!("/d{i}"));
    }
    fs.write_file(format!("{path}/leaf.txt"), b"bottom").unwrap();

    let options = WriteOptions::new();
    let result = zipvault::create_archive_with(&fs, "/deep", "/deep.zip", true, &options).unwrap();
    assert_eq!(result.entries_written, 1);
    assert_eq!(result.directories_written, 200);

    zipvault::extract_with(&fs, "/deep.zip", "/restored", &ExtractOptions::new()).unwrap();
    let restored = format!("/restored{}/leaf.txt", &path["/deep".len()..]);
    assert_eq!(fs.read_file(restored).unwrap(), b"bottom");
}
