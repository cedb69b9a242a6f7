//! # zipvault
//!
//! A pure-Rust engine for creating and extracting ZIP archives, with
//! WinZip AES-256 encryption, split archives and extraction progress
//! reporting.
//!
//! ## Quick Start
//!
//! ### Creating an Archive
//!
//! ```rust,no_run
//! use zipvault::{WriteOptions, Result};
//!
//! fn main() -> Result<()> {
//!     // An empty destination puts `photos.zip` next to the source directory
//!     let result = zipvault::create_archive("photos", "", true, &WriteOptions::new())?;
//!     println!(
//!         "{} files, {:.1}% saved",
//!         result.entries_written,
//!         result.space_savings() * 100.0
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ### Extracting an Archive
//!
//! ```rust,no_run
//! use zipvault::{ArchiveReader, ExtractOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let mut archive = ArchiveReader::open("photos.zip")?;
//!     for entry in archive.entries() {
//!         println!("{}: {} bytes", entry.name, entry.size);
//!     }
//!     archive.extract("./output", &ExtractOptions::default())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Encryption
//!
//! A passphrase turns on WinZip AES-256 (AE-1) for every file entry.
//! Content is compressed first, then encrypted, and each entry is
//! authenticated with HMAC-SHA1 on extraction.
//!
//! ```rust,no_run
//! use zipvault::{ExtractOptions, WriteOptions};
//!
//! let options = WriteOptions::new().passphrase("secret");
//! zipvault::create_archive("report.pdf", "out/", false, &options)?;
//!
//! let options = ExtractOptions::new().passphrase("secret");
//! zipvault::extract("out/report.zip", "restored", &options)?;
//! # Ok::<(), zipvault::Error>(())
//! ```
//!
//! ## Split Archives
//!
//! ```rust,no_run
//! use zipvault::WriteOptions;
//!
//! // Produces backup.z01, backup.z02, ... and finally backup.zip
//! let result = zipvault::create_split_archive(
//!     "data",
//!     "backup.zip",
//!     true,
//!     64 * 1024 * 1024,
//!     &WriteOptions::new(),
//! )?;
//! println!("{} volumes", result.volume_count());
//!
//! // Extraction starts from the last volume
//! zipvault::extract("backup.zip", "restored", &Default::default())?;
//! # Ok::<(), zipvault::Error>(())
//! ```
//!
//! ## Progress Monitoring
//!
//! Extraction can publish `Start`, `Handling { percent }`, `Completed` and
//! `Error` events from a reporting thread; see [`progress`].
//!
//! ## Custom Filesystems
//!
//! Every operation has a `_with` variant taking a [`FileSystem`]. The
//! in-memory [`fs::MemoryFileSystem`] is handy for tests.
//!
//! ## Supported Subset
//!
//! | Feature | Status |
//! |---------|--------|
//! | Stored, Deflate | Read and write |
//! | WinZip AES-256 (AE-1, AE-2 read) | Read and write |
//! | Split archives (`.z01` … `.zip`) | Read and write |
//! | ZIP64 | Rejected |
//! | Traditional PKWARE encryption | Rejected |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod archive_path;
pub mod checksum;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod format;
pub mod fs;
pub mod progress;
pub mod read;
pub mod timestamp;
pub mod volume;
pub mod write;

pub use archive_path::ArchivePath;
pub use codec::CompressionMethod;
pub use crypto::Password;
pub use error::{Error, ErrorKind, Result};
pub use format::Charset;
pub use fs::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use timestamp::DosDateTime;

pub use read::{
    ArchiveEntry, ArchiveReader, ExtractOptions, ExtractResult, extract, extract_all,
    extract_all_with, extract_with, is_valid_archive, is_valid_archive_with,
};

pub use write::{
    ArchiveWriter, EntrySource, SourceEntry, WriteOptions, WriteResult, create_archive,
    create_archive_from, create_archive_from_with, create_archive_with, create_split_archive,
    create_split_archive_with, derive_destination,
};

pub use volume::{VolumeConfig, VolumeDescriptor};

pub use progress::{NoProgress, ProgressEvent, ProgressMonitor, ProgressSink, ProgressSnapshot};
