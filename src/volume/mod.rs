//! Split (multi-volume) archive support.
//!
//! A split archive is an ordinary ZIP archive whose bytes are spread over
//! fixed-size files. Each central directory record names the disk (volume)
//! its local header lives on, and the end record names the last disk, which
//! tells a reader how many volumes to look for.
//!
//! # Volume Naming Convention
//!
//! - `archive.z01` - First volume
//! - `archive.z02` - Second volume
//! - `archive.zip` - Last volume, holding the central directory
//!
//! # Writing
//!
//! ```rust,no_run
//! use zipvault::{WriteOptions, create_split_archive};
//!
//! // 4 MB volumes
//! let options = WriteOptions::new().passphrase("secret");
//! let result = create_split_archive("photos", "", true, 4 * 1024 * 1024, &options)?;
//! for volume in &result.volumes {
//!     println!("{}: {} bytes", volume.path.display(), volume.written);
//! }
//! # Ok::<(), zipvault::Error>(())
//! ```
//!
//! # Reading
//!
//! Readers are opened on the `.zip` path; the numbered volumes next to it are
//! found automatically.

mod config;
mod reader;
mod writer;

pub use config::{VolumeConfig, VolumeDescriptor};
pub use reader::VolumeSet;
pub use writer::{DiskPosition, VolumeWriter};
