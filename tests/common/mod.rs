//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Writes `entries` (relative path, content) under `root`, creating parents.
pub fn write_tree(root: &Path, entries: &[(&str, &[u8])]) {
    for (relative, data) in entries {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, data).expect("Failed to write test file");
    }
}

/// Returns `len` bytes of seeded random data, which does not compress.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

/// Returns `len` bytes of repetitive text, which compresses well.
pub fn text_bytes(len: usize) -> Vec<u8> {
    b"The quick brown fox jumps over the lazy dog. "
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

/// Collects every regular file under `root` as (relative path with `/`
/// separators, content), sorted by path.
pub fn read_tree(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for item in fs::read_dir(&dir).expect("Failed to list directory") {
            let path = item.expect("Failed to read directory entry").path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = relative_name(root, &path);
                files.push((relative, fs::read(&path).expect("Failed to read file")));
            }
        }
    }
    files.sort();
    files
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .expect("Path outside root")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Lists the file names in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to list directory")
        .map(|item| {
            item.expect("Failed to read directory entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

/// Returns the paths of the volumes of a split archive, in disk order.
pub fn volume_paths(archive: &Path, count: usize) -> Vec<PathBuf> {
    (1..count)
        .map(|i| archive.with_extension(format!("z{i:02}")))
        .chain(std::iter::once(archive.to_path_buf()))
        .collect()
}
