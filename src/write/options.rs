//! Write options and configuration for archive creation.

use crate::codec::{CompressionMethod, DEFAULT_LEVEL};
use crate::crypto::Password;
use crate::format::MAX_U16;
use crate::volume::VolumeDescriptor;
use crate::{Error, Result};

/// Options for writing archives.
///
/// # Example
///
/// ```rust
/// use zipvault::{CompressionMethod, WriteOptions};
///
/// let options = WriteOptions::new()
///     .passphrase("secret")
///     .method(CompressionMethod::Deflate)
///     .level(9)?
///     .comment("nightly backup")
///     .volume_capacity(4 * 1024 * 1024);
///
/// assert!(options.is_encrypted());
/// assert!(options.is_split());
/// # Ok::<(), zipvault::Error>(())
/// ```
#[derive(Clone)]
pub struct WriteOptions {
    /// Compression method for file entries.
    pub method: CompressionMethod,
    /// Compression level (0-9).
    pub level: u32,
    /// Passphrase for AES-256 encryption of file entries.
    pub password: Option<Password>,
    /// Archive comment.
    pub comment: Option<String>,
    /// Comment attached to every entry.
    pub entry_comment: Option<String>,
    /// Split volume capacity in bytes.
    pub volume_capacity: Option<u64>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            method: CompressionMethod::Deflate,
            level: DEFAULT_LEVEL,
            password: None,
            comment: None,
            entry_comment: None,
            volume_capacity: None,
        }
    }
}

impl std::fmt::Debug for WriteOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteOptions")
            .field("method", &self.method)
            .field("level", &self.level)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("comment", &self.comment)
            .field("entry_comment", &self.entry_comment)
            .field("volume_capacity", &self.volume_capacity)
            .finish()
    }
}

impl WriteOptions {
    /// Creates new default write options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression method.
    pub fn method(mut self, method: CompressionMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the compression level (0-9).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `level` is greater than 9.
    pub fn level(mut self, level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::InvalidArgument(format!(
                "compression level {level} is out of range 0-9"
            )));
        }
        self.level = level;
        Ok(self)
    }

    /// Sets the compression level, clamping values above 9.
    pub fn level_clamped(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    /// Sets the encryption passphrase.
    ///
    /// An empty passphrase disables encryption.
    pub fn passphrase(mut self, password: impl Into<Password>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// Sets the archive comment.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets a comment stored with every entry.
    pub fn entry_comment(mut self, comment: impl Into<String>) -> Self {
        self.entry_comment = Some(comment.into());
        self
    }

    /// Splits the archive into volumes of at most `capacity` bytes.
    pub fn volume_capacity(mut self, capacity: u64) -> Self {
        self.volume_capacity = Some(capacity);
        self
    }

    /// Returns true if file entries will be encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.password.is_some()
    }

    /// Returns true if the archive will be split into volumes.
    pub fn is_split(&self) -> bool {
        self.volume_capacity.is_some()
    }

    /// Checks the comments fit in their 16-bit length fields.
    pub(crate) fn validate(&self) -> Result<()> {
        for (what, comment) in [
            ("archive comment", &self.comment),
            ("entry comment", &self.entry_comment),
        ] {
            if let Some(comment) = comment {
                if comment.len() as u64 > MAX_U16 {
                    return Err(Error::InvalidArgument(format!(
                        "{what} is {} bytes, the limit is {MAX_U16}",
                        comment.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Result of a write operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    /// Path of the final `.zip` file.
    pub archive_path: std::path::PathBuf,
    /// Number of file entries written.
    pub entries_written: usize,
    /// Number of directory entries written.
    pub directories_written: usize,
    /// Total uncompressed bytes.
    pub total_size: u64,
    /// Total entry payload bytes (compressed, including encryption overhead).
    pub compressed_size: u64,
    /// Total bytes written across all volumes.
    pub archive_size: u64,
    /// Volumes in write order; the last one is the `.zip`.
    pub volumes: Vec<VolumeDescriptor>,
}

impl WriteResult {
    /// Number of volumes written (1 for single-file archives).
    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    /// Returns the compression ratio (compressed / uncompressed).
    pub fn compression_ratio(&self) -> f64 {
        if self.total_size == 0 {
            1.0
        } else {
            self.compressed_size as f64 / self.total_size as f64
        }
    }

    /// Returns the space savings (1 - ratio).
    pub fn space_savings(&self) -> f64 {
        1.0 - self.compression_ratio()
    }
}
