//! Volume writer.

use std::io::{self, Write};
use std::path::PathBuf;

use super::{VolumeConfig, VolumeDescriptor};
use crate::format::{MAX_U16, MAX_U32};
use crate::fs::FileSystem;
use crate::{Error, Result};

/// Position of a record inside a (possibly split) archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskPosition {
    /// ZIP disk number (0-based, in write order).
    pub disk: u16,
    /// Offset within that disk.
    pub offset: u32,
}

/// Output sink of the archive writer.
///
/// In single mode everything goes to a staging file that is renamed to the
/// archive path by [`finish`](Self::finish). In split mode a new volume is
/// opened whenever the current one reaches the configured capacity:
///
/// - entry payload bytes may span volumes,
/// - a local header is never torn: [`write_header`](Self::write_header)
///   moves to the next volume when the header does not fit,
/// - the central directory and end record go entirely into the last volume
///   ([`begin_trailer`](Self::begin_trailer)), which alone may exceed the
///   capacity.
///
/// The writer never seeks.
pub struct VolumeWriter<'a> {
    fs: &'a dyn FileSystem,
    config: VolumeConfig,
    current: Option<Box<dyn Write + Send>>,
    current_path: PathBuf,
    disk: u16,
    written: u64,
    total_written: u64,
    completed: Vec<VolumeDescriptor>,
    created: Vec<PathBuf>,
    in_trailer: bool,
}

impl std::fmt::Debug for VolumeWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeWriter")
            .field("config", &self.config)
            .field("disk", &self.disk)
            .field("written", &self.written)
            .field("total_written", &self.total_written)
            .finish_non_exhaustive()
    }
}

impl<'a> VolumeWriter<'a> {
    /// Creates the first volume.
    ///
    /// `min_capacity` is the smallest capacity the caller can work with (its
    /// largest local header plus one byte); a split configuration below it
    /// fails with [`Error::VolumeConfiguration`] before any file is created.
    pub fn create(fs: &'a dyn FileSystem, config: VolumeConfig, min_capacity: u64) -> Result<Self> {
        if let Some(capacity) = config.capacity() {
            if capacity < min_capacity {
                return Err(Error::VolumeConfiguration {
                    capacity,
                    required: min_capacity,
                });
            }
        }

        let first_path = if config.is_split() {
            config.volume_path(1)
        } else {
            config.staging_path()
        };

        let mut writer = Self {
            fs,
            config,
            current: None,
            current_path: first_path.clone(),
            disk: 0,
            written: 0,
            total_written: 0,
            completed: Vec::new(),
            created: Vec::new(),
            in_trailer: false,
        };
        writer.open_volume(first_path)?;
        Ok(writer)
    }

    fn open_volume(&mut self, path: PathBuf) -> Result<()> {
        let file = self.fs.create(&path).map_err(|e| {
            Error::Io(io::Error::new(
                e.kind(),
                format!("failed to create volume {}: {}", path.display(), e),
            ))
        })?;
        self.created.push(path.clone());
        self.current = Some(file);
        self.current_path = path;
        self.written = 0;
        Ok(())
    }

    /// Closes the current volume and opens the next one.
    fn roll(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.current.take() {
            file.flush()?;
        }
        self.completed.push(VolumeDescriptor {
            index: u32::from(self.disk) + 1,
            path: self.current_path.clone(),
            capacity: self.config.capacity(),
            written: self.written,
        });

        if u64::from(self.disk) + 1 >= MAX_U16 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "too many volumes for a ZIP archive",
            ));
        }
        self.disk += 1;
        let path = self.config.volume_path(u32::from(self.disk) + 1);
        log::debug!(
            "Volume {} full at {} bytes, continuing in {}",
            self.disk,
            self.written,
            path.display()
        );
        self.open_volume(path).map_err(crate::error::into_io_error)
    }

    fn remaining(&self) -> u64 {
        match self.config.capacity() {
            Some(capacity) if !self.in_trailer => capacity.saturating_sub(self.written),
            _ => u64::MAX,
        }
    }

    fn write_raw(&mut self, buf: &[u8]) -> io::Result<()> {
        let file = self
            .current
            .as_mut()
            .ok_or_else(|| io::Error::other("volume is not open"))?;
        file.write_all(buf)?;
        self.written += buf.len() as u64;
        self.total_written += buf.len() as u64;
        Ok(())
    }

    /// Returns the current position.
    pub fn position(&self) -> Result<DiskPosition> {
        if self.written >= MAX_U32 {
            return Err(Error::InvalidArgument(format!(
                "archive offset {} needs ZIP64, which is not supported",
                self.written
            )));
        }
        Ok(DiskPosition {
            disk: self.disk,
            offset: self.written as u32,
        })
    }

    /// Writes a local header without splitting it and returns where it starts.
    pub fn write_header(&mut self, header: &[u8]) -> Result<DiskPosition> {
        let len = header.len() as u64;
        if let Some(capacity) = self.config.capacity() {
            if len + 1 > capacity {
                return Err(Error::VolumeConfiguration {
                    capacity,
                    required: len + 1,
                });
            }
            if len > self.remaining() {
                self.roll()?;
            }
        }
        let position = self.position()?;
        self.write_raw(header)?;
        Ok(position)
    }

    /// Prepares to write the central directory and end record.
    ///
    /// Moves to a fresh volume if `len` bytes do not fit in the current one,
    /// then lifts the capacity limit. Returns where the trailer starts.
    pub fn begin_trailer(&mut self, len: u64) -> Result<DiskPosition> {
        if self.config.is_split() && len > self.remaining() && self.written > 0 {
            self.roll()?;
        }
        self.in_trailer = true;
        self.position()
    }

    /// Number of the disk currently being written.
    pub fn disk(&self) -> u16 {
        self.disk
    }

    /// Total bytes written across all volumes.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Flushes the last volume and moves it to the archive path.
    pub fn finish(mut self) -> Result<Vec<VolumeDescriptor>> {
        let final_path = self.config.volume_path(0);
        let closed = match self.current.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        };
        if let Err(e) = closed.and_then(|()| self.fs.rename(&self.current_path, &final_path)) {
            self.discard();
            return Err(e.into());
        }
        log::debug!(
            "Archive complete: {} across {} volume(s)",
            final_path.display(),
            self.completed.len() + 1
        );

        let mut volumes = std::mem::take(&mut self.completed);
        volumes.push(VolumeDescriptor {
            index: 0,
            path: final_path,
            capacity: self.config.capacity(),
            written: self.written,
        });
        Ok(volumes)
    }

    /// Closes and deletes every file created so far.
    ///
    /// Cleanup is best effort: failures are logged, not returned.
    pub fn discard(mut self) {
        drop(self.current.take());
        for path in &self.created {
            if let Err(e) = self.fs.remove_file(path) {
                log::warn!("Failed to remove incomplete volume {}: {}", path.display(), e);
            }
        }
    }
}

impl Write for VolumeWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut remaining = self.remaining();
        if remaining == 0 {
            self.roll()?;
            remaining = self.remaining();
        }

        let to_write = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        self.write_raw(&buf[..to_write])?;
        Ok(to_write)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.current.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
