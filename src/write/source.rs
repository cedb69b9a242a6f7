//! Entry sources: what goes into an archive.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::fs::{FileSystem, LocalFileSystem};
use crate::{ArchivePath, Error, Result};

/// A single file or directory to be archived.
///
/// A file source yields one entry named after the file. A directory source
/// yields either its immediate files (flat mode) or its whole tree with
/// paths relative to the directory (structured mode).
///
/// # Example
///
/// ```rust,no_run
/// use zipvault::EntrySource;
///
/// let source = EntrySource::local("photos", true)?;
/// for entry in source.entries_local()? {
///     println!("{}", entry.archive_path);
/// }
/// # Ok::<(), zipvault::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySource {
    root: PathBuf,
    is_directory: bool,
    preserve_structure: bool,
}

/// One entry produced by an [`EntrySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Path inside the archive.
    pub archive_path: ArchivePath,
    /// Path of the file or directory on the filesystem.
    pub source_path: PathBuf,
    /// Whether this is a directory entry.
    pub is_directory: bool,
    /// File size at enumeration time (0 for directories).
    pub size: u64,
    /// Last modification time, if the provider knows it.
    pub modified: Option<SystemTime>,
}

impl EntrySource {
    /// Classifies `path` as a file or directory source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the path does not exist or its
    /// metadata cannot be read.
    pub fn new(
        fs: &dyn FileSystem,
        path: impl AsRef<Path>,
        preserve_structure: bool,
    ) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let meta = fs.metadata(&root).map_err(|e| {
            Error::InvalidArgument(format!("cannot read source {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            is_directory: meta.is_dir(),
            preserve_structure,
        })
    }

    /// Like [`new`](Self::new), on the local filesystem.
    pub fn local(path: impl AsRef<Path>, preserve_structure: bool) -> Result<Self> {
        Self::new(&LocalFileSystem, path, preserve_structure)
    }

    /// The source path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true for directory sources.
    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// Returns true if subdirectories are archived with their relative paths.
    pub fn preserve_structure(&self) -> bool {
        self.preserve_structure
    }

    /// Name used when deriving an archive name from this source: the file
    /// stem for files, the directory name for directories.
    pub fn name(&self) -> Result<String> {
        let name = if self.is_directory {
            self.root.file_name()
        } else {
            self.root.file_stem()
        };
        name.and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "cannot derive an archive name from {}",
                    self.root.display()
                ))
            })
    }

    /// Enumerates the entries in archive order.
    ///
    /// Children are visited in name order so the same tree always produces
    /// the same archive. In structured mode every subdirectory is emitted as
    /// a directory entry before its contents.
    pub fn entries(&self, fs: &dyn FileSystem) -> Result<Vec<SourceEntry>> {
        if !self.is_directory {
            let name = self
                .root
                .file_name()
                .ok_or_else(|| {
                    Error::InvalidArgument(format!("{} has no file name", self.root.display()))
                })?;
            let meta = fs.metadata(&self.root)?;
            return Ok(vec![SourceEntry {
                archive_path: ArchivePath::from_relative(Path::new(name))?,
                source_path: self.root.clone(),
                is_directory: false,
                size: meta.len,
                modified: meta.modified,
            }]);
        }

        let mut entries = Vec::new();
        let mut pending = sorted_children(fs, &self.root)?;
        pending.reverse();

        while let Some(path) = pending.pop() {
            let meta = fs.metadata(&path)?;
            if meta.is_dir() && !self.preserve_structure {
                continue;
            }

            let relative = path.strip_prefix(&self.root).map_err(|_| {
                Error::InvalidArgument(format!(
                    "{} is outside {}",
                    path.display(),
                    self.root.display()
                ))
            })?;
            entries.push(SourceEntry {
                archive_path: ArchivePath::from_relative(relative)?,
                source_path: path.clone(),
                is_directory: meta.is_dir(),
                size: if meta.is_dir() { 0 } else { meta.len },
                modified: meta.modified,
            });

            if meta.is_dir() {
                let mut children = sorted_children(fs, &path)?;
                children.reverse();
                pending.extend(children);
            }
        }

        Ok(entries)
    }

    /// Like [`entries`](Self::entries), on the local filesystem.
    pub fn entries_local(&self) -> Result<Vec<SourceEntry>> {
        self.entries(&LocalFileSystem)
    }
}

fn sorted_children(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut children = fs.list_children(dir).map_err(|e| {
        Error::InvalidArgument(format!("cannot list {}: {}", dir.display(), e))
    })?;
    children.sort();
    Ok(children)
}
