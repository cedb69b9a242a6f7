//! Archive reading API.
//!
//! This module opens single and split archives, lists their entries and
//! extracts them.
//!
//! Opening validates the archive structure without touching the
//! destination: the end of central directory record must be found, every
//! volume must be present, and the central directory must parse into
//! exactly the number of entries the end record declares.
//!
//! # Example
//!
//! ```rust,no_run
//! use zipvault::{ArchiveReader, ExtractOptions};
//!
//! let mut archive = ArchiveReader::open("backup.zip")?;
//! for entry in archive.entries() {
//!     println!("{}: {} bytes", entry.name, entry.size);
//! }
//! archive.extract("restored", &ExtractOptions::new().passphrase("secret"))?;
//! # Ok::<(), zipvault::Error>(())
//! ```

mod entry;
mod extraction;
mod options;
mod path_safety;

pub use entry::ArchiveEntry;
pub use options::{ExtractOptions, ExtractResult};

use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::map_io_error;
use crate::format::header::{CentralDirectoryHeader, EndOfCentralDirectory};
use crate::format::reader::SliceReader;
use crate::format::{Charset, EOCD_LEN};
use crate::fs::{FileSystem, LocalFileSystem};
use crate::volume::VolumeSet;
use crate::{Error, Result};

use extraction::publish_failure;

/// Largest span at the end of the last volume that can hold the end of
/// central directory record (fixed part plus a maximal comment).
const END_RECORD_SEARCH_LEN: u64 = EOCD_LEN as u64 + 0xFFFF;

/// A ZIP archive opened for reading.
///
/// Holds the parsed central directory and an open handle on every volume.
/// Dropping the reader closes the volumes.
pub struct ArchiveReader<'a> {
    fs: &'a dyn FileSystem,
    path: PathBuf,
    volumes: VolumeSet,
    entries: Vec<ArchiveEntry>,
    comment: String,
}

impl std::fmt::Debug for ArchiveReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("path", &self.path)
            .field("volumes", &self.volumes)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl ArchiveReader<'static> {
    /// Opens an archive on the local filesystem.
    ///
    /// For split archives pass the path of the last volume (the `.zip`
    /// file); the `.z01`, `.z02`, … volumes are found next to it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        ArchiveReader::open_with(&LocalFileSystem, path, Charset::default())
    }
}

impl<'a> ArchiveReader<'a> {
    /// Opens an archive on the given filesystem, decoding names without
    /// the UTF-8 flag with `charset`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the path does not exist or is a
    ///   directory.
    /// - [`Error::CorruptArchive`] if the structure is invalid or a volume
    ///   is missing.
    /// - [`Error::UnsupportedFeature`] for ZIP64 archives, unknown
    ///   compression methods and non-AES encryption.
    pub fn open_with(
        fs: &'a dyn FileSystem,
        path: impl AsRef<Path>,
        charset: Charset,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = fs.metadata(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::InvalidArgument(format!("archive {} does not exist", path.display()))
            } else {
                Error::Io(e)
            }
        })?;
        if meta.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "archive {} is a directory",
                path.display()
            )));
        }

        let end = read_end_record(fs, &path, meta.len)?;
        if end.central_directory_disk > end.disk_number {
            return Err(Error::corrupt(format!(
                "central directory starts on disk {} but the archive ends on disk {}",
                end.central_directory_disk, end.disk_number
            )));
        }
        if end.central_directory_disk == end.disk_number
            && end.entries_on_disk != end.entries_total
        {
            return Err(Error::corrupt(format!(
                "end record lists {} entries on the last disk but {} in total",
                end.entries_on_disk, end.entries_total
            )));
        }

        let mut volumes = VolumeSet::open(fs, &path, end.disk_number)?;
        let entries = read_central_directory(&mut volumes, &end, charset)?;
        let comment = charset.decode(&end.comment);

        log::debug!(
            "Opened {} ({} entries, {} volume(s))",
            path.display(),
            entries.len(),
            volumes.volume_count()
        );
        Ok(Self {
            fs,
            path,
            volumes,
            entries,
            comment,
        })
    }

    /// Returns the archive path this reader was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns all entries in central directory order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Looks up an entry by its stored name.
    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the names of all entries.
    pub fn entry_paths(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Returns `(name, comment)` for every entry that carries a comment.
    pub fn entry_comments(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter_map(|e| e.comment.as_deref().map(|c| (e.name.as_str(), c)))
            .collect()
    }

    /// Returns the archive comment (empty if none).
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Returns true if any entry is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.entries.iter().any(|e| e.is_encrypted)
    }

    /// Returns the paths of all volumes in disk order.
    pub fn volume_paths(&self) -> &[PathBuf] {
        self.volumes.paths()
    }

    /// Returns the sum of the uncompressed sizes of all entries.
    pub fn total_uncompressed_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

fn read_end_record(fs: &dyn FileSystem, path: &Path, len: u64) -> Result<EndOfCentralDirectory> {
    let tail_len = len.min(END_RECORD_SEARCH_LEN);
    let mut file = fs.open_read(path)?;
    file.seek(SeekFrom::Start(len - tail_len))?;
    let mut tail = vec![0u8; tail_len as usize];
    file.read_exact(&mut tail).map_err(map_io_error)?;
    EndOfCentralDirectory::find(&tail)
}

fn read_central_directory(
    volumes: &mut VolumeSet,
    end: &EndOfCentralDirectory,
    charset: Charset,
) -> Result<Vec<ArchiveEntry>> {
    let start = volumes.position_of(
        end.central_directory_disk,
        u64::from(end.central_directory_offset),
    )?;
    let size = u64::from(end.central_directory_size);
    if start + size > volumes.total_size() {
        return Err(Error::corrupt(format!(
            "central directory ({size} bytes at {start}) extends past the end of the archive"
        )));
    }

    volumes.seek(SeekFrom::Start(start))?;
    let mut data = vec![0u8; size as usize];
    volumes.read_exact(&mut data).map_err(map_io_error)?;

    let mut r = SliceReader::new(&data, "central directory");
    let mut entries = Vec::with_capacity(usize::from(end.entries_total));
    for index in 0..usize::from(end.entries_total) {
        let header = CentralDirectoryHeader::parse(&mut r)?;
        let entry = ArchiveEntry::from_header(index, &header, charset)?;
        volumes
            .position_of(entry.disk_start, entry.local_header_offset)
            .map_err(|_| {
                Error::corrupt(format!(
                    "local header of '{}' points outside the archive",
                    entry.name
                ))
            })?;
        entries.push(entry);
    }
    if r.remaining() != 0 {
        return Err(Error::corrupt(format!(
            "central directory has {} bytes after the {} declared entries",
            r.remaining(),
            end.entries_total
        )));
    }
    Ok(entries)
}

/// Returns true if `path` opens as a structurally valid archive.
pub fn is_valid_archive(path: impl AsRef<Path>) -> bool {
    is_valid_archive_with(&LocalFileSystem, path)
}

/// Like [`is_valid_archive`], on the given filesystem.
pub fn is_valid_archive_with(fs: &dyn FileSystem, path: impl AsRef<Path>) -> bool {
    match ArchiveReader::open_with(fs, path.as_ref(), Charset::default()) {
        Ok(_) => true,
        Err(e) => {
            log::debug!("{} is not a valid archive: {}", path.as_ref().display(), e);
            false
        }
    }
}

/// Extracts an archive on the local filesystem into `destination`.
///
/// Failures while opening are published to the progress sink as a single
/// `Error` event. With [`ExtractOptions::delete_archive_on_success`] every
/// volume is removed afterwards; a removal failure is logged and reported
/// through [`ExtractResult::archive_deleted`], not as an error.
pub fn extract(
    archive: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<ExtractResult> {
    extract_with(&LocalFileSystem, archive, destination, options)
}

/// Like [`extract`], on the given filesystem.
pub fn extract_with(
    fs: &dyn FileSystem,
    archive: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<ExtractResult> {
    let mut reader = match ArchiveReader::open_with(fs, archive.as_ref(), options.charset) {
        Ok(reader) => reader,
        Err(e) => {
            publish_failure(options, &e);
            return Err(e);
        }
    };
    let mut result = reader.extract(destination, options)?;

    if options.delete_archive_on_success {
        let paths = reader.volume_paths().to_vec();
        drop(reader);
        result.archive_deleted = remove_volumes(fs, &paths);
    }
    Ok(result)
}

/// Extracts several archives into the same destination, in order.
///
/// Stops at the first failing archive.
pub fn extract_all<P: AsRef<Path>>(
    archives: &[P],
    destination: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<Vec<ExtractResult>> {
    extract_all_with(&LocalFileSystem, archives, destination, options)
}

/// Like [`extract_all`], on the given filesystem.
pub fn extract_all_with<P: AsRef<Path>>(
    fs: &dyn FileSystem,
    archives: &[P],
    destination: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<Vec<ExtractResult>> {
    let destination = destination.as_ref();
    archives
        .iter()
        .map(|archive| extract_with(fs, archive, destination, options))
        .collect()
}

fn remove_volumes(fs: &dyn FileSystem, paths: &[PathBuf]) -> bool {
    let mut removed = true;
    for path in paths {
        if let Err(e) = fs.remove_file(path) {
            log::warn!("Failed to delete archive volume {}: {}", path.display(), e);
            removed = false;
        }
    }
    if removed {
        log::debug!("Deleted {} archive volume(s)", paths.len());
    }
    removed
}
