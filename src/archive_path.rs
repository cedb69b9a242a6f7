//! Archive path type with validation for secure path handling.

use crate::{Error, Result};
use std::fmt;
use std::path::{Component, Path};

/// Maximum length for archive paths (in bytes).
///
/// ZIP stores name lengths in a 16-bit field.
const MAX_PATH_LENGTH: usize = u16::MAX as usize;

/// A validated path inside an archive.
///
/// `ArchivePath` uses forward slashes and guarantees that:
/// - No NUL bytes are present
/// - The path is not absolute (does not start with `/`)
/// - No empty segments exist (no `//` or trailing `/`)
/// - No `.` or `..` segments are present (prevents path traversal)
///
/// Directory entries are stored with a trailing `/`; that suffix is added by
/// [`entry_name`](Self::entry_name) and is not part of the path itself.
///
/// # Examples
///
/// ```
/// use zipvault::ArchivePath;
///
/// let path = ArchivePath::new("dir/file.txt").unwrap();
/// assert_eq!(path.as_str(), "dir/file.txt");
/// assert_eq!(path.entry_name(true), "dir/file.txt/");
///
/// assert!(ArchivePath::new("../secret").is_err());
/// assert!(ArchivePath::new("/absolute/path").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchivePath(String);

impl ArchivePath {
    /// Creates a new `ArchivePath` from a string, validating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArchivePath`] if the path:
    /// - Contains NUL bytes
    /// - Is an absolute path (starts with `/`)
    /// - Contains empty segments (e.g., `a//b`)
    /// - Contains `.` or `..` segments
    /// - Is empty or longer than 65535 bytes
    pub fn new(s: &str) -> Result<Self> {
        Self::validate(s)?;
        Ok(Self(s.to_string()))
    }

    /// Builds an archive path from a relative filesystem path.
    ///
    /// Components are joined with `/` regardless of the platform separator.
    pub fn from_relative(path: &Path) -> Result<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(segment) => {
                    let segment = segment.to_str().ok_or_else(|| {
                        Error::InvalidArchivePath(format!(
                            "{} is not valid UTF-8",
                            path.display()
                        ))
                    })?;
                    segments.push(segment);
                }
                Component::CurDir => {}
                _ => {
                    return Err(Error::InvalidArchivePath(format!(
                        "{} is not a relative path",
                        path.display()
                    )));
                }
            }
        }
        Self::new(&segments.join("/"))
    }

    /// Validates an archive path string.
    fn validate(s: &str) -> Result<()> {
        if s.contains('\0') {
            return Err(Error::InvalidArchivePath("contains NUL byte".into()));
        }

        if s.is_empty() {
            return Err(Error::InvalidArchivePath("empty path".into()));
        }

        if s.len() > MAX_PATH_LENGTH {
            return Err(Error::InvalidArchivePath(format!(
                "path exceeds maximum length of {} bytes",
                MAX_PATH_LENGTH
            )));
        }

        if s.starts_with('/') {
            return Err(Error::InvalidArchivePath(
                "absolute path not allowed".into(),
            ));
        }

        if s.ends_with('/') {
            return Err(Error::InvalidArchivePath(
                "trailing slash not allowed".into(),
            ));
        }

        for segment in s.split('/') {
            if segment.is_empty() {
                return Err(Error::InvalidArchivePath(
                    "empty segment (consecutive slashes)".into(),
                ));
            }
            if segment == "." {
                return Err(Error::InvalidArchivePath("'.' segment not allowed".into()));
            }
            if segment == ".." {
                return Err(Error::InvalidArchivePath(
                    "'..' segment not allowed (path traversal)".into(),
                ));
            }
        }

        Ok(())
    }

    /// Returns the path as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name stored in headers: directories get a trailing `/`.
    pub fn entry_name(&self, is_directory: bool) -> String {
        if is_directory {
            format!("{}/", self.0)
        } else {
            self.0.clone()
        }
    }

    /// Returns the parent directory of this path, if any.
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rfind('/')
            .map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Returns the file name (last segment) of this path.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns an iterator over the path components (segments).
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl AsRef<str> for ArchivePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for ArchivePath {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_nested_path() {
        let path = ArchivePath::new("dir/subdir/file.txt").unwrap();
        assert_eq!(path.as_str(), "dir/subdir/file.txt");
        assert_eq!(path.file_name(), "file.txt");
        assert_eq!(path.parent().unwrap().as_str(), "dir/subdir");
        assert_eq!(
            path.components().collect::<Vec<_>>(),
            vec!["dir", "subdir", "file.txt"]
        );
    }

    #[test]
    fn test_valid_unicode() {
        assert!(ArchivePath::new("日本語/файл.txt").is_ok());
    }

    #[test]
    fn test_invalid_paths() {
        for bad in ["", "/abs", "a//b", "a/", "./a", "a/./b", "..", "a/../b", "a\0b"] {
            let err = ArchivePath::new(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidArchivePath(_)), "{bad:?}");
        }
    }

    #[test]
    fn test_valid_dot_names() {
        assert!(ArchivePath::new(".gitignore").is_ok());
        assert!(ArchivePath::new("file..txt").is_ok());
        assert!(ArchivePath::new("...").is_ok());
    }

    #[test]
    fn test_invalid_too_long() {
        let long = "a".repeat(MAX_PATH_LENGTH + 1);
        assert!(ArchivePath::new(&long).is_err());
    }

    #[test]
    fn test_from_relative() {
        let rel: PathBuf = ["sub", "deeper", "b.txt"].iter().collect();
        let path = ArchivePath::from_relative(&rel).unwrap();
        assert_eq!(path.as_str(), "sub/deeper/b.txt");

        assert!(ArchivePath::from_relative(Path::new("/etc/passwd")).is_err());
        assert!(ArchivePath::from_relative(Path::new("../x")).is_err());
        assert!(ArchivePath::from_relative(Path::new("")).is_err());
    }

    #[test]
    fn test_entry_name() {
        let path = ArchivePath::new("sub").unwrap();
        assert_eq!(path.entry_name(true), "sub/");
        assert_eq!(path.entry_name(false), "sub");
        assert_eq!(path.to_string(), "sub");
    }
}
