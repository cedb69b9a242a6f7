//! Filesystem provider abstraction.
//!
//! The archive engine never touches storage directly. Every read, write,
//! directory creation, rename and delete goes through a [`FileSystem`]
//! implementation, so the same engine can archive files on disk
//! ([`LocalFileSystem`]) or entirely in memory ([`MemoryFileSystem`]).
//!
//! # Example
//!
//! ```rust
//! use std::path::Path;
//! use zipvault::fs::{FileSystem, MemoryFileSystem};
//!
//! let fs = MemoryFileSystem::new();
//! fs.write_file("/data/hello.txt", b"Hello").unwrap();
//!
//! assert!(fs.exists(Path::new("/data/hello.txt")));
//! assert_eq!(fs.read_file("/data/hello.txt").unwrap(), b"Hello");
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

/// A readable, seekable stream that can be moved across threads.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// What kind of object a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

/// Metadata reported by a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// File or directory.
    pub kind: FileKind,
    /// Length in bytes (0 for directories).
    pub len: u64,
    /// Last modification time, when the provider knows it.
    pub modified: Option<SystemTime>,
}

impl FileMetadata {
    /// Returns true if the path is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// Returns true if the path is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

/// Storage operations consumed by the archive engine.
pub trait FileSystem: Send + Sync {
    /// Opens an existing file for reading.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>>;

    /// Creates a file for writing, truncating it if it already exists.
    ///
    /// The parent directory must exist.
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;

    /// Returns metadata for a file or directory.
    fn metadata(&self, path: &Path) -> io::Result<FileMetadata>;

    /// Lists the immediate children of a directory, in no particular order.
    fn list_children(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Creates a directory and all of its missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Deletes a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Renames a file, replacing the target if it exists.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Sets the modification time of a file.
    ///
    /// Providers that cannot store timestamps keep the default no-op.
    fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()> {
        let _ = (path, time);
        Ok(())
    }

    /// Returns true if the path exists.
    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }
}

/// [`FileSystem`] backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    /// Creates a new local filesystem provider.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let meta = std::fs::metadata(path)?;
        let kind = if meta.is_dir() {
            FileKind::Directory
        } else {
            FileKind::File
        };
        Ok(FileMetadata {
            kind,
            len: if meta.is_dir() { 0 } else { meta.len() },
            modified: meta.modified().ok(),
        })
    }

    fn list_children(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()> {
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(time))
    }
}

/// Contents of one in-memory file.
///
/// The buffer is shared with any open writer so data written after a rename
/// still lands in the renamed file.
#[derive(Debug, Clone)]
struct MemoryFile {
    data: Arc<Mutex<Vec<u8>>>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct MemoryTree {
    files: BTreeMap<PathBuf, MemoryFile>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryTree {
    fn is_dir(&self, path: &Path) -> bool {
        is_root(path) || self.dirs.contains(path)
    }

    fn require_parent_dir(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !self.is_dir(parent) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("parent directory of {} does not exist", path.display()),
            )),
            _ => Ok(()),
        }
    }
}

fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.parent().is_none()
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

/// Writer appending to a shared in-memory buffer.
struct SharedBufferWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for SharedBufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .buffer
            .lock()
            .map_err(|_| io::Error::other("mutex poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory [`FileSystem`].
///
/// Cloning the handle shares the same tree. Paths are used exactly as given,
/// so callers should stick to one style (for example absolute `/a/b` paths).
/// The root (`/` or the empty path) always exists.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    tree: Arc<Mutex<MemoryTree>>,
}

impl MemoryFileSystem {
    /// Creates an empty in-memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, MemoryTree>> {
        self.tree
            .lock()
            .map_err(|_| io::Error::other("mutex poisoned"))
    }

    /// Writes a whole file, creating its parent directories.
    pub fn write_file(&self, path: impl AsRef<Path>, data: &[u8]) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        let mut writer = self.create(path)?;
        writer.write_all(data)
    }

    /// Returns a copy of a file's contents.
    pub fn read_file(&self, path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        let path = path.as_ref();
        let tree = self.lock()?;
        let file = tree.files.get(path).ok_or_else(|| not_found(path))?;
        let data = file
            .data
            .lock()
            .map_err(|_| io::Error::other("mutex poisoned"))?;
        Ok(data.clone())
    }

    /// Returns the paths of all files, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.lock()
            .map(|tree| tree.files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl FileSystem for MemoryFileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        let data = self.read_file(path)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let mut tree = self.lock()?;
        if tree.is_dir(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a directory", path.display()),
            ));
        }
        tree.require_parent_dir(path)?;
        let buffer = Arc::new(Mutex::new(Vec::new()));
        tree.files.insert(
            path.to_path_buf(),
            MemoryFile {
                data: Arc::clone(&buffer),
                modified: SystemTime::now(),
            },
        );
        Ok(Box::new(SharedBufferWriter { buffer }))
    }

    fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let tree = self.lock()?;
        if tree.is_dir(path) {
            return Ok(FileMetadata {
                kind: FileKind::Directory,
                len: 0,
                modified: None,
            });
        }
        let file = tree.files.get(path).ok_or_else(|| not_found(path))?;
        let len = file
            .data
            .lock()
            .map_err(|_| io::Error::other("mutex poisoned"))?
            .len() as u64;
        Ok(FileMetadata {
            kind: FileKind::File,
            len,
            modified: Some(file.modified),
        })
    }

    fn list_children(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let tree = self.lock()?;
        if !tree.is_dir(dir) {
            return Err(not_found(dir));
        }
        let is_child = |p: &&PathBuf| match p.parent() {
            Some(parent) => parent == dir || (is_root(dir) && is_root(parent)),
            None => false,
        };
        let mut children: Vec<PathBuf> = tree.dirs.iter().filter(is_child).cloned().collect();
        children.extend(tree.files.keys().filter(is_child).cloned());
        Ok(children)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut tree = self.lock()?;
        for ancestor in path.ancestors() {
            if is_root(ancestor) {
                continue;
            }
            if tree.files.contains_key(ancestor) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} exists and is not a directory", ancestor.display()),
                ));
            }
            tree.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut tree = self.lock()?;
        tree.files.remove(path).map(|_| ()).ok_or_else(|| not_found(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut tree = self.lock()?;
        if tree.is_dir(to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a directory", to.display()),
            ));
        }
        tree.require_parent_dir(to)?;
        let file = tree.files.remove(from).ok_or_else(|| not_found(from))?;
        tree.files.insert(to.to_path_buf(), file);
        Ok(())
    }

    fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()> {
        let mut tree = self.lock()?;
        let file = tree.files.get_mut(path).ok_or_else(|| not_found(path))?;
        file.modified = time;
        Ok(())
    }
}
