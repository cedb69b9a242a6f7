//! Error types for ZIP archive operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes of the archive engine, a coarse [`ErrorKind`] classification,
//! and a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. Creation
//! and extraction are all-or-nothing: the first failing entry aborts the whole
//! call and its error is returned.
//!
//! ```rust,no_run
//! use zipvault::{Error, ErrorKind, ExtractOptions};
//!
//! fn unpack(path: &str, dest: &str, passphrase: &str) -> zipvault::Result<()> {
//!     let options = ExtractOptions::new().passphrase(passphrase);
//!     match zipvault::extract(path, dest, &options) {
//!         Ok(_) => Ok(()),
//!         Err(e) if e.kind() == ErrorKind::AuthenticationFailed => {
//!             eprintln!("Wrong passphrase, please try again");
//!             Err(e)
//!         }
//!         Err(e @ Error::CorruptArchive(_)) => {
//!             eprintln!("The archive is damaged: {e}");
//!             Err(e)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::io;

/// Coarse classification of [`Error`] values.
///
/// Callers that only need to decide *what to do next* (prompt for a new
/// passphrase, report a damaged file, fix the volume size) should match on
/// [`Error::kind`] instead of the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input from the caller: empty or unreadable source, an archive path
    /// that cannot be represented, a destination that cannot be created.
    InvalidArgument,
    /// The archive failed structural validation or an integrity check.
    CorruptArchive,
    /// Wrong passphrase, missing passphrase, or tampered encrypted data.
    AuthenticationFailed,
    /// The split volume capacity is too small to hold the minimum unit.
    VolumeConfiguration,
    /// An underlying filesystem read, write or create failed.
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidArgument => "invalid argument",
            Self::CorruptArchive => "corrupt archive",
            Self::AuthenticationFailed => "authentication failed",
            Self::VolumeConfiguration => "volume configuration error",
            Self::Io => "I/O failure",
        };
        f.write_str(name)
    }
}

/// Helper struct for formatting AuthenticationFailed error messages.
struct AuthenticationDisplay<'a> {
    entry_name: Option<&'a str>,
    reason: &'a str,
}

impl std::fmt::Display for AuthenticationDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Authentication failed")?;
        if let Some(name) = self.entry_name {
            write!(f, " for entry '{}'", name)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// The main error type for archive operations.
///
/// | Kind | Variants |
/// |------|----------|
/// | [`ErrorKind::Io`] | [`Io`][Self::Io] |
/// | [`ErrorKind::InvalidArgument`] | [`InvalidArgument`][Self::InvalidArgument], [`InvalidArchivePath`][Self::InvalidArchivePath] |
/// | [`ErrorKind::CorruptArchive`] | [`CorruptArchive`][Self::CorruptArchive], [`CrcMismatch`][Self::CrcMismatch], [`PathTraversal`][Self::PathTraversal], [`UnsupportedFeature`][Self::UnsupportedFeature] |
/// | [`ErrorKind::AuthenticationFailed`] | [`AuthenticationFailed`][Self::AuthenticationFailed] |
/// | [`ErrorKind::VolumeConfiguration`] | [`VolumeConfiguration`][Self::VolumeConfiguration] |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error reported by the filesystem provider.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The caller supplied an argument the engine cannot work with.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The archive failed structural validation.
    ///
    /// Returned before any extraction side effects when the end record or
    /// central directory cannot be read, and during extraction when a local
    /// header is missing or entry data is truncated.
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    /// The CRC-32 of extracted data does not match the central directory.
    #[error("CRC mismatch for entry '{entry_name}': expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        /// The entry path.
        entry_name: String,
        /// The CRC recorded in the archive.
        expected: u32,
        /// The CRC of the data actually produced.
        actual: u32,
    },

    /// An entry name would escape the extraction directory.
    #[error("Path traversal detected in entry '{path}'")]
    PathTraversal {
        /// The offending entry name as stored in the archive.
        path: String,
    },

    /// Decryption could not be authenticated.
    ///
    /// This is distinct from [`CorruptArchive`][Self::CorruptArchive] so that
    /// callers can prompt for another passphrase instead of treating the
    /// archive as unusable.
    #[error("{}", AuthenticationDisplay { entry_name: entry_name.as_deref(), reason })]
    AuthenticationFailed {
        /// The entry being decrypted, if known.
        entry_name: Option<String>,
        /// What failed: verification value, HMAC, or a missing passphrase.
        reason: String,
    },

    /// The split volume capacity cannot hold the smallest unsplittable unit.
    #[error("Volume capacity of {capacity} bytes is too small: at least {required} bytes are required")]
    VolumeConfiguration {
        /// The configured capacity.
        capacity: u64,
        /// The minimum capacity this archive needs.
        required: u64,
    },

    /// A path inside the archive is not representable.
    #[error("Invalid archive path: {0}")]
    InvalidArchivePath(String),

    /// The archive uses a ZIP feature outside the supported subset.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// Description of the feature.
        feature: String,
    },
}

/// A specialized Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidArgument(_) | Self::InvalidArchivePath(_) => ErrorKind::InvalidArgument,
            Self::CorruptArchive(_)
            | Self::CrcMismatch { .. }
            | Self::PathTraversal { .. }
            | Self::UnsupportedFeature { .. } => ErrorKind::CorruptArchive,
            Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            Self::VolumeConfiguration { .. } => ErrorKind::VolumeConfiguration,
        }
    }

    /// Returns true if this error indicates damaged archive data.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptArchive(_) | Self::CrcMismatch { .. })
    }

    /// Returns true if a different passphrase might make the operation succeed.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Returns the entry name associated with this error, if any.
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Self::CrcMismatch { entry_name, .. } => Some(entry_name),
            Self::PathTraversal { path } => Some(path),
            Self::AuthenticationFailed { entry_name, .. } => entry_name.as_deref(),
            _ => None,
        }
    }

    /// Creates an [`AuthenticationFailed`][Self::AuthenticationFailed] error.
    pub fn authentication_failed(entry_name: Option<String>, reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            entry_name,
            reason: reason.into(),
        }
    }

    /// Creates a [`CorruptArchive`][Self::CorruptArchive] error.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptArchive(reason.into())
    }

    /// Attaches an entry name to an authentication error that was raised
    /// inside a reader adapter without knowing which entry it belonged to.
    pub(crate) fn with_entry_name(self, name: &str) -> Self {
        match self {
            Self::AuthenticationFailed {
                entry_name: None,
                reason,
            } => Self::AuthenticationFailed {
                entry_name: Some(name.to_string()),
                reason,
            },
            other => other,
        }
    }
}

/// Wraps an [`Error`] into an [`io::Error`] so it can travel through
/// `Read`/`Write` adapters and be recovered by [`map_io_error`].
pub(crate) fn into_io_error(err: Error) -> io::Error {
    match err {
        Error::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

fn carries_error(e: &io::Error) -> bool {
    e.get_ref().is_some_and(|inner| inner.is::<Error>())
}

/// Recovers an [`Error`] wrapped by [`into_io_error`]; any other I/O error
/// stays an [`Error::Io`].
///
/// Used on the write path, where a short read from a source file is an I/O
/// problem and not archive corruption.
pub(crate) fn unwrap_io_error(e: io::Error) -> Error {
    if !carries_error(&e) {
        return Error::Io(e);
    }
    let kind = e.kind();
    match e.into_inner().map(|inner| inner.downcast::<Error>()) {
        Some(Ok(inner)) => *inner,
        _ => Error::Io(io::Error::from(kind)),
    }
}

/// Converts an I/O error raised while decoding entry data back into a typed
/// error.
///
/// Errors produced by [`into_io_error`] are unwrapped. A truncated stream or
/// undecodable deflate data means the archive is damaged.
pub(crate) fn map_io_error(e: io::Error) -> Error {
    if carries_error(&e) {
        return unwrap_io_error(e);
    }
    match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::CorruptArchive(format!("truncated entry data: {e}")),
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
            Error::CorruptArchive(format!("undecodable entry data: {e}"))
        }
        _ => Error::Io(e),
    }
}
