//! Path safety validation for archive extraction.
//!
//! Entry names come from untrusted input. Before anything is written, each
//! name is turned into a relative path that cannot leave the destination
//! directory.

use std::path::PathBuf;

use crate::{Error, Result};

/// Converts an entry name into a relative path under the destination.
///
/// Both `/` and `\` are treated as separators. Empty and `.` segments are
/// dropped.
///
/// # Errors
///
/// Returns [`Error::PathTraversal`] if the name is absolute (including
/// drive-letter prefixes), contains a `..` segment or a NUL byte, or has no
/// segments left.
pub(crate) fn safe_relative_path(name: &str) -> Result<PathBuf> {
    let traversal = || Error::PathTraversal {
        path: name.to_string(),
    };

    if name.contains('\0') || name.starts_with(['/', '\\']) {
        return Err(traversal());
    }
    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return Err(traversal());
    }

    let mut relative = PathBuf::new();
    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return Err(traversal()),
            segment => relative.push(segment),
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(traversal());
    }
    Ok(relative)
}
