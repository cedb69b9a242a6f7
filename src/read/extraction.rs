//! File extraction from archives.
//!
//! Extraction is validated up front: every entry name is checked for path
//! traversal and encrypted entries need a passphrase, before the destination
//! is touched. Entries are then decoded in central directory order with
//! the data flowing through
//!
//! ```text
//! volumes -> [AES-256 envelope] -> decompressor -> CRC-32 -> output file
//! ```

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::checksum::Crc32Reader;
use crate::codec::build_decoder;
use crate::crypto::{AesDecryptingReader, Password};
use crate::error::map_io_error;
use crate::format::LOCAL_HEADER_LEN;
use crate::format::header::LocalFileHeader;
use crate::progress::{ProgressEvent, ProgressMonitor, ReportingTask};
use crate::volume::VolumeSet;
use crate::{Error, Result};

use super::path_safety::safe_relative_path;
use super::{ArchiveEntry, ArchiveReader, ExtractOptions, ExtractResult};

/// Writer that feeds the number of bytes written into a progress monitor.
struct MonitoredWriter<'m, W> {
    inner: W,
    monitor: &'m ProgressMonitor,
}

impl<W: Write> Write for MonitoredWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.monitor.add_consumed(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Publishes a failure that happened before the reporting thread started.
pub(super) fn publish_failure(options: &ExtractOptions, err: &Error) {
    if let Some(sink) = &options.progress {
        sink.on_event(ProgressEvent::Error {
            message: err.to_string(),
        });
    }
}

/// Positions the volume set on an entry's payload and limits reads to it.
fn open_payload<'v>(
    volumes: &'v mut VolumeSet,
    entry: &ArchiveEntry,
) -> Result<io::Take<&'v mut VolumeSet>> {
    let start = volumes.position_of(entry.disk_start, entry.local_header_offset)?;
    volumes.seek(SeekFrom::Start(start))?;

    let mut fixed = [0u8; LOCAL_HEADER_LEN];
    volumes.read_exact(&mut fixed).map_err(map_io_error)?;
    let trailing = LocalFileHeader::trailing_len(&fixed)
        .map_err(|e| Error::corrupt(format!("entry '{}': {}", entry.name, e)))?;
    volumes.seek(SeekFrom::Current(trailing as i64))?;

    Ok(Read::take(volumes, entry.compressed_size))
}

/// Decompresses `input` into `output` and checks size and CRC.
fn decode_into<R: Read, W: Write>(input: R, entry: &ArchiveEntry, output: &mut W) -> Result<u64> {
    // One byte past the declared size is enough to detect an overrun
    let decoder = build_decoder(entry.method, input).take(entry.size + 1);
    let mut reader = Crc32Reader::new(decoder);
    io::copy(&mut reader, output).map_err(map_io_error)?;
    output.flush()?;

    let size = reader.bytes_read();
    if size != entry.size {
        return Err(Error::corrupt(format!(
            "entry '{}' decoded to {} bytes, expected {}",
            entry.name, size, entry.size
        )));
    }
    if entry.checks_crc() && reader.crc() != entry.crc32 {
        return Err(Error::CrcMismatch {
            entry_name: entry.name.clone(),
            expected: entry.crc32,
            actual: reader.crc(),
        });
    }
    Ok(size)
}

fn open_envelope<'v>(
    volumes: &'v mut VolumeSet,
    entry: &ArchiveEntry,
    password: &Password,
) -> Result<AesDecryptingReader<io::Take<&'v mut VolumeSet>>> {
    let payload = open_payload(volumes, entry)?;
    AesDecryptingReader::new(payload, password, entry.compressed_size)
        .map_err(|e| e.with_entry_name(&entry.name))
}

/// Decodes one file entry into the writer returned by `open_output`.
///
/// For encrypted entries both the verification value and the
/// authentication code are checked before `open_output` is called, so a
/// wrong passphrase never produces output. An authentication failure in the
/// decoding pass still takes precedence over any decoding error.
pub(super) fn decode_entry<W, F>(
    volumes: &mut VolumeSet,
    entry: &ArchiveEntry,
    password: Option<&Password>,
    open_output: F,
) -> Result<u64>
where
    W: Write,
    F: FnOnce() -> Result<W>,
{
    if entry.aes.is_none() {
        let payload = open_payload(volumes, entry)?;
        let mut output = open_output()?;
        return decode_into(payload, entry, &mut output);
    }

    let password = password.ok_or_else(|| {
        Error::authentication_failed(Some(entry.name.clone()), "passphrase required")
    })?;
    open_envelope(volumes, entry, password)?
        .authenticate()
        .map_err(|e| e.with_entry_name(&entry.name))?;

    let mut envelope = open_envelope(volumes, entry, password)?;
    let mut output = open_output()?;
    let decoded = decode_into(&mut envelope, entry, &mut output);
    let authenticated = envelope.finish().map_err(|e| e.with_entry_name(&entry.name));

    match (decoded, authenticated) {
        (_, Err(e)) if e.is_authentication_error() => Err(e),
        (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        (Ok(size), Ok(())) => Ok(size),
    }
}

impl ArchiveReader<'_> {
    /// Extracts every entry into `destination`, creating it if needed.
    ///
    /// The call blocks until all entries are written. When
    /// [`ExtractOptions::progress`] is set, progress events are published
    /// from a second thread, which has delivered its final event by the
    /// time this returns.
    ///
    /// # Errors
    ///
    /// - [`Error::PathTraversal`] or a missing passphrase
    ///   ([`Error::AuthenticationFailed`]) before anything is written.
    /// - [`Error::InvalidArgument`] if the destination cannot be created.
    /// - Any entry failure aborts the remaining entries; files already
    ///   extracted are left in place.
    pub fn extract(
        &mut self,
        destination: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Result<ExtractResult> {
        let destination = destination.as_ref();
        let targets = match self.prepare(destination, options) {
            Ok(targets) => targets,
            Err(e) => {
                publish_failure(options, &e);
                return Err(e);
            }
        };

        let monitor = options.monitor.clone().unwrap_or_default();
        monitor.begin(self.total_uncompressed_size());
        let reporter = match &options.progress {
            Some(sink) => {
                let spawned =
                    ReportingTask::spawn(monitor.clone(), Arc::clone(sink), options.poll_interval);
                match spawned {
                    Ok(task) => Some(task),
                    Err(e) => {
                        publish_failure(options, &e);
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        log::debug!(
            "Extracting {} entries from {} into {}",
            self.entries.len(),
            self.path.display(),
            destination.display()
        );
        let outcome = self.extract_entries(&targets, options, &monitor);
        match &outcome {
            Ok(result) => {
                monitor.finish();
                log::debug!(
                    "Extracted {} file(s), {} bytes",
                    result.entries_extracted,
                    result.bytes_extracted
                );
            }
            Err(e) => monitor.fail(e.to_string()),
        }
        if let Some(reporter) = reporter {
            reporter.join();
        }
        outcome
    }

    /// Validates entry names and the destination; returns the target path
    /// of every entry.
    fn prepare(&self, destination: &Path, options: &ExtractOptions) -> Result<Vec<PathBuf>> {
        let mut targets = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            targets.push(destination.join(safe_relative_path(&entry.name)?));
            if entry.is_encrypted && options.password.is_none() {
                return Err(Error::authentication_failed(
                    Some(entry.name.clone()),
                    "passphrase required",
                ));
            }
        }

        match self.fs.metadata(destination) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(Error::InvalidArgument(format!(
                    "destination {} exists and is not a directory",
                    destination.display()
                )));
            }
            Err(_) => self.fs.create_dir_all(destination).map_err(|e| {
                Error::InvalidArgument(format!(
                    "cannot create destination directory {}: {}",
                    destination.display(),
                    e
                ))
            })?,
        }
        Ok(targets)
    }

    fn extract_entries(
        &mut self,
        targets: &[PathBuf],
        options: &ExtractOptions,
        monitor: &ProgressMonitor,
    ) -> Result<ExtractResult> {
        let fs = self.fs;
        let mut result = ExtractResult::default();

        for (entry, target) in self.entries.iter().zip(targets) {
            if entry.is_directory {
                fs.create_dir_all(target)?;
                result.directories_created += 1;
                continue;
            }

            let size = decode_entry(&mut self.volumes, entry, options.password.as_ref(), || {
                if let Some(parent) = target.parent() {
                    fs.create_dir_all(parent)?;
                }
                Ok(MonitoredWriter {
                    inner: fs.create(target)?,
                    monitor,
                })
            })?;

            if options.preserve_modified_time {
                if let Some(modified) = entry.modified() {
                    if let Err(e) = fs.set_modified(target, modified) {
                        log::warn!(
                            "Failed to restore modification time of {}: {}",
                            target.display(),
                            e
                        );
                    }
                }
            }

            result.entries_extracted += 1;
            result.bytes_extracted += size;
        }

        Ok(result)
    }

    /// Decodes one file entry into memory.
    pub fn extract_to_vec(&mut self, name: &str, password: Option<&Password>) -> Result<Vec<u8>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::InvalidArgument(format!("no entry named '{name}'")))?;
        if entry.is_directory {
            return Err(Error::InvalidArgument(format!("'{name}' is a directory")));
        }

        let mut buffer = Vec::new();
        let output = &mut buffer;
        decode_entry(&mut self.volumes, entry, password, move || Ok(output))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, MemoryFileSystem};
    use crate::volume::VolumeConfig;
    use crate::{ArchivePath, ArchiveWriter, CompressionMethod, WriteOptions};

    fn build(fs: &MemoryFileSystem, options: WriteOptions, files: &[(&str, &[u8])]) {
        let mut writer =
            ArchiveWriter::create(fs, VolumeConfig::single("/a.zip"), options).unwrap();
        for (name, data) in files {
            writer
                .add_stream(ArchivePath::new(name).unwrap(), &mut &data[..], None)
                .unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extract_to_vec() {
        let fs = MemoryFileSystem::new();
        build(&fs, WriteOptions::new(), &[("x.txt", b"hello world")]);
        let mut reader = ArchiveReader::open_with(&fs, "/a.zip", Default::default()).unwrap();
        assert_eq!(reader.extract_to_vec("x.txt", None).unwrap(), b"hello world");
        assert!(reader.extract_to_vec("missing", None).is_err());
    }

    #[test]
    fn test_encrypted_to_vec() {
        let fs = MemoryFileSystem::new();
        let options = WriteOptions::new().passphrase("pw");
        build(&fs, options, &[("s.txt", b"secret data")]);
        let mut reader = ArchiveReader::open_with(&fs, "/a.zip", Default::default()).unwrap();

        let password = Password::new("pw");
        assert_eq!(
            reader.extract_to_vec("s.txt", Some(&password)).unwrap(),
            b"secret data"
        );
        let err = reader.extract_to_vec("s.txt", None).unwrap_err();
        assert!(err.is_authentication_error());
        assert_eq!(err.entry_name(), Some("s.txt"));
    }

    #[test]
    fn test_crc_mismatch_detected() {
        let fs = MemoryFileSystem::new();
        let options = WriteOptions::new().method(CompressionMethod::Stored);
        build(&fs, options, &[("f.bin", b"0123456789")]);

        // Flip one content byte: header is 30 bytes + 5-byte name
        let mut data = fs.read_file("/a.zip").unwrap();
        data[35] ^= 0xff;
        fs.write_file("/a.zip", &data).unwrap();

        let mut reader = ArchiveReader::open_with(&fs, "/a.zip", Default::default()).unwrap();
        let err = reader
            .extract("/out", &ExtractOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::CrcMismatch { .. }));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_path_traversal_rejected_before_writing() {
        let fs = MemoryFileSystem::new();
        build(&fs, WriteOptions::new(), &[("ok.txt", b"1"), ("zz.txt", b"2")]);

        // Rename the second entry to "../zz.t" in both the local header and
        // the central directory; the name length stays 6
        let mut data = fs.read_file("/a.zip").unwrap();
        for i in 0..data.len() - 6 {
            if &data[i..i + 6] == b"zz.txt" {
                data[i..i + 6].copy_from_slice(b"../zz.");
            }
        }
        fs.write_file("/a.zip", &data).unwrap();

        let mut reader = ArchiveReader::open_with(&fs, "/a.zip", Default::default()).unwrap();
        let err = reader.extract("/out", &ExtractOptions::new()).unwrap_err();
        assert!(matches!(err, Error::PathTraversal { .. }));
        assert!(!fs.exists(Path::new("/out")));
    }

    #[test]
    fn test_destination_is_a_file() {
        let fs = MemoryFileSystem::new();
        build(&fs, WriteOptions::new(), &[("x", b"x")]);
        fs.write_file("/blocker", b"").unwrap();

        let mut reader = ArchiveReader::open_with(&fs, "/a.zip", Default::default()).unwrap();
        let err = reader.extract("/blocker", &ExtractOptions::new()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }
}
