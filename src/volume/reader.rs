//! Split archive reader.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;

use super::VolumeConfig;
use crate::fs::{FileSystem, ReadSeek};
use crate::{Error, Result};

/// A reader presenting all volumes of an archive as one stream.
///
/// Volumes are concatenated in disk order (`.z01`, `.z02`, …, `.zip`).
/// A `(disk, offset)` pair from the central directory is turned into a
/// stream position with [`position_of`](Self::position_of).
pub struct VolumeSet {
    volumes: Vec<Box<dyn ReadSeek>>,
    paths: Vec<PathBuf>,
    /// Logical start of each volume.
    starts: Vec<u64>,
    sizes: Vec<u64>,
    total_size: u64,
    position: u64,
    current_volume: usize,
    /// Whether the current volume's cursor is known to be at `position`.
    synced: bool,
}

impl VolumeSet {
    /// Opens every volume of an archive whose last disk is `last_disk`.
    ///
    /// A missing volume is reported as a corrupt archive.
    pub fn open(
        fs: &dyn FileSystem,
        archive_path: &std::path::Path,
        last_disk: u16,
    ) -> Result<Self> {
        let config = VolumeConfig::single(archive_path);
        let mut volumes = Vec::with_capacity(usize::from(last_disk) + 1);
        let mut paths = Vec::with_capacity(usize::from(last_disk) + 1);
        let mut sizes = Vec::with_capacity(usize::from(last_disk) + 1);

        for disk in 0..=last_disk {
            let path = config.disk_path(disk, last_disk);
            let meta = fs.metadata(&path).map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    Error::corrupt(format!(
                        "volume {} of {} is missing: {}",
                        disk + 1,
                        last_disk + 1,
                        path.display()
                    ))
                } else {
                    Error::Io(e)
                }
            })?;
            volumes.push(fs.open_read(&path)?);
            paths.push(path);
            sizes.push(meta.len);
        }

        Ok(Self::from_parts(volumes, paths, sizes))
    }

    fn from_parts(volumes: Vec<Box<dyn ReadSeek>>, paths: Vec<PathBuf>, sizes: Vec<u64>) -> Self {
        let mut starts = Vec::with_capacity(sizes.len());
        let mut total_size = 0u64;
        for &size in &sizes {
            starts.push(total_size);
            total_size += size;
        }

        Self {
            volumes,
            paths,
            starts,
            sizes,
            total_size,
            position: 0,
            current_volume: 0,
            synced: false,
        }
    }

    /// Number of volumes.
    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    /// Paths of all volumes in disk order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Sizes of all volumes in disk order.
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    /// Total size across all volumes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Converts a disk-relative offset into a stream position.
    pub fn position_of(&self, disk: u16, offset: u64) -> Result<u64> {
        let disk = usize::from(disk);
        match (self.starts.get(disk), self.sizes.get(disk)) {
            (Some(&start), Some(&size)) if offset <= size => Ok(start + offset),
            _ => Err(Error::corrupt(format!(
                "offset {offset} on disk {disk} is outside the archive"
            ))),
        }
    }

    fn locate(&self, pos: u64) -> usize {
        match self.starts.binary_search(&pos) {
            Ok(mut i) => {
                // Skip empty volumes that share a start offset
                while i + 1 < self.sizes.len() && self.sizes[i] == 0 {
                    i += 1;
                }
                i
            }
            Err(i) => i.saturating_sub(1),
        }
    }
}

impl std::fmt::Debug for VolumeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeSet")
            .field("paths", &self.paths)
            .field("total_size", &self.total_size)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl Read for VolumeSet {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.position < self.total_size && !buf.is_empty() {
            let index = self.current_volume;
            let volume_end = self.starts[index] + self.sizes[index];
            if self.position >= volume_end {
                self.current_volume += 1;
                self.synced = false;
                continue;
            }

            let volume_position = self.position - self.starts[index];
            let volume = &mut self.volumes[index];
            if !self.synced {
                volume.seek(SeekFrom::Start(volume_position))?;
                self.synced = true;
            }

            let to_read = buf
                .len()
                .min(usize::try_from(volume_end - self.position).unwrap_or(usize::MAX));
            let n = volume.read(&mut buf[..to_read])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("volume {} ended early", self.paths[index].display()),
                ));
            }
            self.position += n as u64;
            return Ok(n);
        }
        Ok(0)
    }
}

impl Seek for VolumeSet {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(p) => self.total_size.checked_add_signed(p),
            SeekFrom::Current(p) => self.position.checked_add_signed(p),
        }
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot seek before start of stream",
            )
        })?;

        self.position = new_pos.min(self.total_size);
        self.current_volume = self.locate(self.position);
        self.synced = false;
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use std::path::Path;

    fn three_volumes() -> MemoryFileSystem {
        let fs = MemoryFileSystem::new();
        fs.write_file("/v/a.z01", b"0123").unwrap();
        fs.write_file("/v/a.z02", b"4567").unwrap();
        fs.write_file("/v/a.zip", b"89").unwrap();
        fs
    }

    #[test]
    fn test_reads_across_volumes() {
        let fs = three_volumes();
        let mut set = VolumeSet::open(&fs, Path::new("/v/a.zip"), 2).unwrap();
        let mut out = Vec::new();
        set.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"0123456789");
        assert_eq!(set.volume_count(), 3);
        assert_eq!(set.total_size(), 10);
    }

    #[test]
    fn test_seek_and_position_of() {
        let fs = three_volumes();
        let mut set = VolumeSet::open(&fs, Path::new("/v/a.zip"), 2).unwrap();

        let pos = set.position_of(1, 2).unwrap();
        assert_eq!(pos, 6);
        set.seek(SeekFrom::Start(pos)).unwrap();
        let mut buf = [0u8; 3];
        set.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"678");

        set.seek(SeekFrom::End(-1)).unwrap();
        set.read_exact(&mut buf[..1]).unwrap();
        assert_eq!(buf[0], b'9');

        assert!(set.position_of(3, 0).is_err());
        assert!(set.position_of(2, 5).is_err());
    }

    #[test]
    fn test_missing_volume_is_corruption() {
        let fs = MemoryFileSystem::new();
        fs.write_file("/v/a.z01", b"0123").unwrap();
        fs.write_file("/v/a.zip", b"89").unwrap();
        let err = VolumeSet::open(&fs, Path::new("/v/a.zip"), 2).unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("a.z02"));
    }

    #[test]
    fn test_single_volume() {
        let fs = MemoryFileSystem::new();
        fs.write_file("/x.zip", b"abc").unwrap();
        let mut set = VolumeSet::open(&fs, Path::new("/x.zip"), 0).unwrap();
        assert_eq!(set.paths(), &[PathBuf::from("/x.zip")]);
        let mut out = String::new();
        set.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
    }
}
