//! Configuration for single and split archives.

use std::path::{Path, PathBuf};

/// Suffix of the staging file a single-volume archive is written to.
const STAGING_SUFFIX: &str = "partial";

/// Where an archive is written and whether it is split.
///
/// Split archives follow the `.z01`, `.z02`, …, `.zip` convention: every
/// volume but the last is numbered, and the last one carries the archive
/// path itself.
///
/// # Example
///
/// ```rust
/// use std::path::PathBuf;
/// use zipvault::volume::VolumeConfig;
///
/// let config = VolumeConfig::split("backup.zip", 4 * 1024 * 1024);
/// assert_eq!(config.volume_path(0), PathBuf::from("backup.zip"));
/// assert_eq!(config.volume_path(1), PathBuf::from("backup.z01"));
/// assert_eq!(config.volume_path(12), PathBuf::from("backup.z12"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeConfig {
    archive_path: PathBuf,
    capacity: Option<u64>,
}

impl VolumeConfig {
    /// Configuration for an archive written as one file.
    pub fn single(archive_path: impl AsRef<Path>) -> Self {
        Self {
            archive_path: archive_path.as_ref().to_path_buf(),
            capacity: None,
        }
    }

    /// Configuration for an archive split into volumes of at most `capacity`
    /// bytes.
    pub fn split(archive_path: impl AsRef<Path>, capacity: u64) -> Self {
        Self {
            archive_path: archive_path.as_ref().to_path_buf(),
            capacity: Some(capacity),
        }
    }

    /// Path of the final `.zip` file.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Volume capacity in bytes, if splitting.
    pub fn capacity(&self) -> Option<u64> {
        self.capacity
    }

    /// Returns true for split archives.
    pub fn is_split(&self) -> bool {
        self.capacity.is_some()
    }

    /// Path of a volume by index: 0 is the final `.zip`, `n` is `.z{n:02}`.
    pub fn volume_path(&self, index: u32) -> PathBuf {
        if index == 0 {
            self.archive_path.clone()
        } else {
            self.archive_path.with_extension(format!("z{index:02}"))
        }
    }

    /// Path of a ZIP disk given the number of the last disk.
    ///
    /// Disk `d` is volume `d + 1`, except the last disk which is the `.zip`.
    pub fn disk_path(&self, disk: u16, last_disk: u16) -> PathBuf {
        if disk == last_disk {
            self.volume_path(0)
        } else {
            self.volume_path(u32::from(disk) + 1)
        }
    }

    /// Path a single-volume archive is staged at until it is complete.
    pub fn staging_path(&self) -> PathBuf {
        let mut name = self.archive_path.clone().into_os_string();
        name.push(".");
        name.push(STAGING_SUFFIX);
        PathBuf::from(name)
    }
}

/// One physical volume of a written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeDescriptor {
    /// Volume index: 0 for the final `.zip`, `n` for `.z{n:02}`.
    pub index: u32,
    /// Location of the volume.
    pub path: PathBuf,
    /// Configured capacity (`None` for single-volume archives).
    pub capacity: Option<u64>,
    /// Bytes written to the volume.
    pub written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_path_generation() {
        let config = VolumeConfig::split("/out/data.zip", 1024);

        assert_eq!(config.volume_path(0), PathBuf::from("/out/data.zip"));
        assert_eq!(config.volume_path(1), PathBuf::from("/out/data.z01"));
        assert_eq!(config.volume_path(9), PathBuf::from("/out/data.z09"));
        assert_eq!(config.volume_path(100), PathBuf::from("/out/data.z100"));
    }

    #[test]
    fn test_disk_path() {
        let config = VolumeConfig::split("a.zip", 1024);
        assert_eq!(config.disk_path(0, 2), PathBuf::from("a.z01"));
        assert_eq!(config.disk_path(1, 2), PathBuf::from("a.z02"));
        assert_eq!(config.disk_path(2, 2), PathBuf::from("a.zip"));
        assert_eq!(config.disk_path(0, 0), PathBuf::from("a.zip"));
    }

    #[test]
    fn test_staging_path() {
        let config = VolumeConfig::single("/tmp/out.zip");
        assert_eq!(config.staging_path(), PathBuf::from("/tmp/out.zip.partial"));
        assert!(!config.is_split());
        assert_eq!(config.capacity(), None);
    }
}
