//! Archive writing API.
//!
//! Archives are written in one forward pass. Each file entry is a local
//! header, its payload and a data descriptor carrying the CRC and sizes; the
//! central directory and end record follow the last entry. Nothing is ever
//! rewritten, which is what allows output to be split across volumes.
//!
//! Per entry the data flows through
//!
//! ```text
//! source -> CRC-32 -> compressor -> [AES-256 envelope] -> volume writer
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use zipvault::{WriteOptions, create_archive};
//!
//! let options = WriteOptions::new().passphrase("secret");
//! let result = create_archive("photos", "", true, &options)?;
//! println!(
//!     "Wrote {} entries to {}",
//!     result.entries_written,
//!     result.archive_path.display()
//! );
//! # Ok::<(), zipvault::Error>(())
//! ```

mod destination;
mod options;
mod source;

pub use destination::{ARCHIVE_EXTENSION, derive_destination};
pub use options::{WriteOptions, WriteResult};
pub use source::{EntrySource, SourceEntry};

use std::collections::HashSet;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::checksum::{CountingWriter, Crc32Reader};
use crate::codec::{CompressionMethod, EntryEncoder, method};
use crate::crypto::{AES_EXTRA_FIELD_LEN, AesEncryptingWriter, AesExtraField};
use crate::error::unwrap_io_error;
use crate::format::header::{
    CentralDirectoryHeader, DataDescriptor, EndOfCentralDirectory, LocalFileHeader,
};
use crate::format::{
    DOS_DIRECTORY_ATTRIBUTE, EOCD_LEN, LOCAL_HEADER_LEN, MAX_U16, MAX_U32, UNIX_DIR_MODE,
    UNIX_FILE_MODE, VERSION_MADE_BY, VERSION_NEEDED_AES, VERSION_NEEDED_DEFAULT, flags,
};
use crate::fs::{FileSystem, LocalFileSystem};
use crate::timestamp::DosDateTime;
use crate::volume::{VolumeConfig, VolumeWriter};
use crate::{ArchivePath, Error, Result};

/// State of the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    /// Accepting new entries.
    AcceptingEntries,
    /// An entry failed; the archive can only be discarded.
    Failed,
}

/// Smallest volume capacity that can hold a local header with a name of
/// `name_len` bytes plus one byte of content.
fn required_capacity(name_len: usize, is_directory: bool, encrypted: bool) -> u64 {
    let extra = if encrypted && !is_directory {
        AES_EXTRA_FIELD_LEN
    } else {
        0
    };
    (LOCAL_HEADER_LEN + name_len + extra + 1) as u64
}

fn compress<R, W>(source: &mut R, method: CompressionMethod, level: u32, output: W) -> io::Result<W>
where
    R: Read + ?Sized,
    W: Write,
{
    let mut encoder = EntryEncoder::new(method, level, output);
    io::copy(source, &mut encoder)?;
    encoder.finish()
}

/// A ZIP archive writer.
///
/// Entries are written as they are added. If adding an entry fails the
/// writer refuses further entries, and dropping it (or calling
/// [`abort`](Self::abort)) removes every file it created, so a failed
/// archive never appears at its final path.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use zipvault::fs::{FileSystem, MemoryFileSystem};
/// use zipvault::volume::VolumeConfig;
/// use zipvault::{ArchivePath, ArchiveWriter, WriteOptions};
///
/// let fs = MemoryFileSystem::new();
/// let mut writer = ArchiveWriter::create(
///     &fs,
///     VolumeConfig::single("/out.zip"),
///     WriteOptions::new(),
/// )?;
/// writer.add_directory(ArchivePath::new("docs")?, None)?;
/// writer.add_stream(ArchivePath::new("docs/readme.txt")?, &mut &b"hello"[..], None)?;
/// let result = writer.finish()?;
///
/// assert_eq!(result.entries_written, 1);
/// assert!(fs.exists(Path::new("/out.zip")));
/// # Ok::<(), zipvault::Error>(())
/// ```
pub struct ArchiveWriter<'a> {
    fs: &'a dyn FileSystem,
    volumes: Option<VolumeWriter<'a>>,
    archive_path: PathBuf,
    options: WriteOptions,
    state: WriterState,
    directory: Vec<CentralDirectoryHeader>,
    names: HashSet<String>,
    entries_written: usize,
    directories_written: usize,
    total_size: u64,
    compressed_size: u64,
}

impl std::fmt::Debug for ArchiveWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWriter")
            .field("archive_path", &self.archive_path)
            .field("options", &self.options)
            .field("state", &self.state)
            .field("entries", &self.directory.len())
            .finish_non_exhaustive()
    }
}

impl<'a> ArchiveWriter<'a> {
    /// Starts a new archive.
    ///
    /// For split configurations the capacity must hold at least a local
    /// header with a one-byte name plus one byte of content; entries with
    /// longer names may still fail later with
    /// [`Error::VolumeConfiguration`].
    pub fn create(
        fs: &'a dyn FileSystem,
        config: VolumeConfig,
        options: WriteOptions,
    ) -> Result<Self> {
        let min_capacity = required_capacity(1, false, options.is_encrypted());
        Self::open(fs, config, options, min_capacity)
    }

    fn open(
        fs: &'a dyn FileSystem,
        config: VolumeConfig,
        options: WriteOptions,
        min_capacity: u64,
    ) -> Result<Self> {
        options.validate()?;
        let archive_path = config.archive_path().to_path_buf();
        let volumes = VolumeWriter::create(fs, config, min_capacity)?;
        log::debug!(
            "Creating archive {} (method {}, encrypted: {})",
            archive_path.display(),
            options.method,
            options.is_encrypted()
        );

        Ok(Self {
            fs,
            volumes: Some(volumes),
            archive_path,
            options,
            state: WriterState::AcceptingEntries,
            directory: Vec::new(),
            names: HashSet::new(),
            entries_written: 0,
            directories_written: 0,
            total_size: 0,
            compressed_size: 0,
        })
    }

    fn ensure_accepting_entries(&self) -> Result<()> {
        match self.state {
            WriterState::AcceptingEntries => Ok(()),
            WriterState::Failed => Err(Error::InvalidArgument(
                "archive writer is unusable after a failed entry".into(),
            )),
        }
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = WriterState::Failed;
        }
        result
    }

    fn volumes(&mut self) -> Result<&mut VolumeWriter<'a>> {
        self.volumes
            .as_mut()
            .ok_or_else(|| Error::InvalidArgument("archive writer is closed".into()))
    }

    /// Reserves a unique entry name.
    fn claim_name(&mut self, path: &ArchivePath, is_directory: bool) -> Result<String> {
        let name = path.entry_name(is_directory);
        if name.len() as u64 > MAX_U16 {
            return Err(Error::InvalidArgument(format!(
                "entry name of {} bytes does not fit in a ZIP header",
                name.len()
            )));
        }
        if self.directory.len() as u64 >= MAX_U16 {
            return Err(Error::InvalidArgument(format!(
                "more than {} entries need ZIP64, which is not supported",
                MAX_U16 - 1
            )));
        }
        if !self.names.insert(name.clone()) {
            return Err(Error::InvalidArgument(format!("duplicate entry '{name}'")));
        }
        Ok(name)
    }

    fn entry_comment(&self) -> Vec<u8> {
        self.options
            .entry_comment
            .as_deref()
            .map(|c| c.as_bytes().to_vec())
            .unwrap_or_default()
    }

    /// Adds a file or directory from the filesystem.
    pub fn add_file(&mut self, archive_path: ArchivePath, source_path: &Path) -> Result<()> {
        self.ensure_accepting_entries()?;
        let meta = match self.fs.metadata(source_path) {
            Ok(meta) => meta,
            Err(e) => return self.record(Err(e.into())),
        };
        if meta.is_dir() {
            return self.add_directory(archive_path, meta.modified);
        }
        let mut reader = match self.fs.open_read(source_path) {
            Ok(reader) => reader,
            Err(e) => return self.record(Err(e.into())),
        };
        self.add_stream(archive_path, &mut reader, meta.modified)
    }

    /// Adds an entry enumerated by an [`EntrySource`].
    pub fn add_entry(&mut self, entry: &SourceEntry) -> Result<()> {
        if entry.is_directory {
            self.add_directory(entry.archive_path.clone(), entry.modified)
        } else {
            self.add_file(entry.archive_path.clone(), &entry.source_path)
        }
    }

    /// Adds a directory entry.
    ///
    /// Directory entries are stored, never encrypted, and have no content.
    pub fn add_directory(
        &mut self,
        archive_path: ArchivePath,
        modified: Option<SystemTime>,
    ) -> Result<()> {
        self.ensure_accepting_entries()?;
        let result = self.write_directory_entry(&archive_path, modified);
        self.record(result)
    }

    /// Adds a file entry with content read from `source`.
    pub fn add_stream(
        &mut self,
        archive_path: ArchivePath,
        source: &mut dyn Read,
        modified: Option<SystemTime>,
    ) -> Result<()> {
        self.ensure_accepting_entries()?;
        let result = self.write_file_entry(&archive_path, source, modified);
        self.record(result)
    }

    fn write_directory_entry(
        &mut self,
        path: &ArchivePath,
        modified: Option<SystemTime>,
    ) -> Result<()> {
        let name = self.claim_name(path, true)?;
        let flags = if name.is_ascii() { 0 } else { flags::UTF8 };
        let modified = modified.map(DosDateTime::from_system_time).unwrap_or_default();
        let local = LocalFileHeader {
            version_needed: VERSION_NEEDED_DEFAULT,
            flags,
            method: method::STORED,
            modified,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            name: name.into_bytes(),
            extra: Vec::new(),
        };
        let comment = self.entry_comment();
        let position = self.volumes()?.write_header(&local.to_bytes())?;

        log::debug!("Added directory entry {}", path);
        self.directory.push(CentralDirectoryHeader {
            version_made_by: VERSION_MADE_BY,
            version_needed: local.version_needed,
            flags: local.flags,
            method: local.method,
            modified,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            disk_start: position.disk,
            internal_attributes: 0,
            external_attributes: (UNIX_DIR_MODE << 16) | DOS_DIRECTORY_ATTRIBUTE,
            local_header_offset: position.offset,
            name: local.name,
            extra: local.extra,
            comment,
        });
        self.directories_written += 1;
        Ok(())
    }

    fn write_file_entry(
        &mut self,
        path: &ArchivePath,
        source: &mut dyn Read,
        modified: Option<SystemTime>,
    ) -> Result<()> {
        let name = self.claim_name(path, false)?;
        let compression = self.options.method;
        let level = self.options.level;

        let (header_method, version_needed, mut entry_flags, extra) =
            if self.options.is_encrypted() {
                (
                    method::AES,
                    VERSION_NEEDED_AES,
                    flags::ENCRYPTED | flags::DATA_DESCRIPTOR,
                    AesExtraField::new(compression).to_bytes(),
                )
            } else {
                (
                    compression.id(),
                    VERSION_NEEDED_DEFAULT,
                    flags::DATA_DESCRIPTOR,
                    Vec::new(),
                )
            };
        if !name.is_ascii() {
            entry_flags |= flags::UTF8;
        }

        let modified = modified.map(DosDateTime::from_system_time).unwrap_or_default();
        let local = LocalFileHeader {
            version_needed,
            flags: entry_flags,
            method: header_method,
            modified,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            name: name.into_bytes(),
            extra,
        };
        let comment = self.entry_comment();

        let volumes = self
            .volumes
            .as_mut()
            .ok_or_else(|| Error::InvalidArgument("archive writer is closed".into()))?;
        let position = volumes.write_header(&local.to_bytes())?;

        let mut reader = Crc32Reader::new(source);
        let counter = CountingWriter::new(&mut *volumes);
        let counter = match &self.options.password {
            Some(password) => {
                let envelope = AesEncryptingWriter::new(counter, password)?;
                compress(&mut reader, compression, level, envelope)
                    .and_then(AesEncryptingWriter::finish)
            }
            None => compress(&mut reader, compression, level, counter),
        }
        .map_err(unwrap_io_error)?;
        let compressed_size = counter.count();
        let uncompressed_size = reader.bytes_read();
        let crc32 = reader.crc();

        if compressed_size >= MAX_U32 || uncompressed_size >= MAX_U32 {
            return Err(Error::InvalidArgument(format!(
                "entry '{path}' is too large without ZIP64, which is not supported"
            )));
        }

        let descriptor = DataDescriptor {
            crc32,
            compressed_size: compressed_size as u32,
            uncompressed_size: uncompressed_size as u32,
        };
        volumes
            .write_all(&descriptor.to_bytes())
            .map_err(unwrap_io_error)?;

        log::debug!(
            "Added {} ({} -> {} bytes, disk {})",
            path,
            uncompressed_size,
            compressed_size,
            position.disk
        );
        self.directory.push(CentralDirectoryHeader {
            version_made_by: VERSION_MADE_BY,
            version_needed,
            flags: entry_flags,
            method: header_method,
            modified,
            crc32,
            compressed_size: descriptor.compressed_size,
            uncompressed_size: descriptor.uncompressed_size,
            disk_start: position.disk,
            internal_attributes: 0,
            external_attributes: UNIX_FILE_MODE << 16,
            local_header_offset: position.offset,
            name: local.name,
            extra: local.extra,
            comment,
        });
        self.entries_written += 1;
        self.total_size += uncompressed_size;
        self.compressed_size += compressed_size;
        Ok(())
    }

    fn write_trailer(&self, volumes: &mut VolumeWriter<'_>) -> Result<()> {
        let central: Vec<u8> = self.directory.iter().flat_map(|h| h.to_bytes()).collect();
        if central.len() as u64 >= MAX_U32 {
            return Err(Error::InvalidArgument(
                "central directory is too large without ZIP64".into(),
            ));
        }
        let comment = self
            .options
            .comment
            .as_deref()
            .map(|c| c.as_bytes().to_vec())
            .unwrap_or_default();

        let trailer_len = (central.len() + EOCD_LEN + comment.len()) as u64;
        let start = volumes.begin_trailer(trailer_len)?;
        volumes.write_all(&central).map_err(unwrap_io_error)?;

        let count = self.directory.len() as u16;
        let end = EndOfCentralDirectory {
            disk_number: volumes.disk(),
            central_directory_disk: start.disk,
            entries_on_disk: count,
            entries_total: count,
            central_directory_size: central.len() as u32,
            central_directory_offset: start.offset,
            comment,
        };
        volumes.write_all(&end.to_bytes()).map_err(unwrap_io_error)?;
        volumes.flush()?;
        Ok(())
    }

    /// Writes the central directory, closes the last volume and moves it to
    /// the archive path.
    pub fn finish(mut self) -> Result<WriteResult> {
        self.ensure_accepting_entries()?;
        let mut volumes = self
            .volumes
            .take()
            .ok_or_else(|| Error::InvalidArgument("archive writer is closed".into()))?;

        if let Err(e) = self.write_trailer(&mut volumes) {
            volumes.discard();
            return Err(e);
        }
        let archive_size = volumes.total_written();
        let descriptors = volumes.finish()?;

        Ok(WriteResult {
            archive_path: self.archive_path.clone(),
            entries_written: self.entries_written,
            directories_written: self.directories_written,
            total_size: self.total_size,
            compressed_size: self.compressed_size,
            archive_size,
            volumes: descriptors,
        })
    }

    /// Abandons the archive and removes every file written so far.
    pub fn abort(mut self) {
        if let Some(volumes) = self.volumes.take() {
            volumes.discard();
        }
    }
}

impl Drop for ArchiveWriter<'_> {
    fn drop(&mut self) {
        if let Some(volumes) = self.volumes.take() {
            log::debug!("Discarding unfinished archive {}", self.archive_path.display());
            volumes.discard();
        }
    }
}

/// Creates an archive from a file or directory on the local filesystem.
///
/// `destination` may be empty, an existing directory, or the archive path
/// (see [`derive_destination`]). If `options` sets a volume capacity the
/// archive is split.
pub fn create_archive(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    preserve_structure: bool,
    options: &WriteOptions,
) -> Result<WriteResult> {
    create_archive_with(&LocalFileSystem, source, destination, preserve_structure, options)
}

/// Like [`create_archive`], on the given filesystem.
pub fn create_archive_with(
    fs: &dyn FileSystem,
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    preserve_structure: bool,
    options: &WriteOptions,
) -> Result<WriteResult> {
    let source = EntrySource::new(fs, source, preserve_structure)?;
    create_archive_from_with(fs, std::slice::from_ref(&source), destination, options)
}

/// Creates an archive split into volumes of at most `capacity` bytes.
///
/// Volumes are named `.z01`, `.z02`, … with the last one at the `.zip`
/// path. Only the last volume can exceed `capacity`, when the central
/// directory alone does not fit.
///
/// # Errors
///
/// Returns [`Error::VolumeConfiguration`] before creating any file if
/// `capacity` cannot hold the largest local header plus one byte.
pub fn create_split_archive(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    preserve_structure: bool,
    capacity: u64,
    options: &WriteOptions,
) -> Result<WriteResult> {
    create_split_archive_with(
        &LocalFileSystem,
        source,
        destination,
        preserve_structure,
        capacity,
        options,
    )
}

/// Like [`create_split_archive`], on the given filesystem.
pub fn create_split_archive_with(
    fs: &dyn FileSystem,
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    preserve_structure: bool,
    capacity: u64,
    options: &WriteOptions,
) -> Result<WriteResult> {
    let options = options.clone().volume_capacity(capacity);
    create_archive_with(fs, source, destination, preserve_structure, &options)
}

/// Creates one archive from several sources.
///
/// The destination is derived from the first source. Entry paths must be
/// unique across all sources.
pub fn create_archive_from(
    sources: &[EntrySource],
    destination: impl AsRef<Path>,
    options: &WriteOptions,
) -> Result<WriteResult> {
    create_archive_from_with(&LocalFileSystem, sources, destination, options)
}

/// Like [`create_archive_from`], on the given filesystem.
pub fn create_archive_from_with(
    fs: &dyn FileSystem,
    sources: &[EntrySource],
    destination: impl AsRef<Path>,
    options: &WriteOptions,
) -> Result<WriteResult> {
    let first = sources
        .first()
        .ok_or_else(|| Error::InvalidArgument("no sources to archive".into()))?;
    options.validate()?;

    let mut planned = Vec::new();
    for source in sources {
        planned.extend(source.entries(fs)?);
    }

    let encrypted = options.is_encrypted();
    let mut names = HashSet::new();
    let mut min_capacity = required_capacity(1, false, encrypted);
    for entry in &planned {
        let name = entry.archive_path.entry_name(entry.is_directory);
        let required = required_capacity(name.len(), entry.is_directory, encrypted);
        min_capacity = min_capacity.max(required);
        if !names.insert(name) {
            return Err(Error::InvalidArgument(format!(
                "duplicate entry '{}' across sources",
                entry.archive_path.entry_name(entry.is_directory)
            )));
        }
    }

    let destination = derive_destination(fs, first, destination.as_ref())?;
    let config = match options.volume_capacity {
        Some(capacity) => VolumeConfig::split(&destination, capacity),
        None => VolumeConfig::single(&destination),
    };

    let mut writer = ArchiveWriter::open(fs, config, options.clone(), min_capacity)?;
    for entry in &planned {
        writer.add_entry(entry)?;
    }
    let result = writer.finish()?;

    log::debug!(
        "Archived {} file(s) and {} directorie(s) into {} ({} volume(s))",
        result.entries_written,
        result.directories_written,
        result.archive_path.display(),
        result.volume_count()
    );
    Ok(result)
}
