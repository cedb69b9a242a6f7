//! Archive entry type.

use std::time::SystemTime;

use crate::codec::{CompressionMethod, method};
use crate::crypto::AesExtraField;
use crate::format::charset::decode_name;
use crate::format::header::CentralDirectoryHeader;
use crate::format::{Charset, flags};
use crate::timestamp::DosDateTime;
use crate::{Error, Result};

/// An entry in a ZIP archive, as described by the central directory.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ArchiveEntry {
    /// Name as stored in the archive, decoded. Directories end with `/`.
    pub name: String,
    /// Whether this entry is a directory.
    pub is_directory: bool,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Stored payload size, including any encryption envelope.
    pub compressed_size: u64,
    /// CRC-32 of the uncompressed content.
    pub crc32: u32,
    /// Compression applied to the content.
    pub method: CompressionMethod,
    /// Whether the payload is AES encrypted.
    pub is_encrypted: bool,
    /// Entry comment, if any.
    pub comment: Option<String>,
    /// Modification time in MS-DOS format.
    pub modified_dos: DosDateTime,
    /// Index in the central directory.
    pub index: usize,
    pub(crate) disk_start: u16,
    pub(crate) local_header_offset: u64,
    pub(crate) aes: Option<AesExtraField>,
}

impl ArchiveEntry {
    /// Builds an entry from its central directory record.
    pub(crate) fn from_header(
        index: usize,
        header: &CentralDirectoryHeader,
        charset: Charset,
    ) -> Result<Self> {
        let utf8 = header.flags & flags::UTF8 != 0;
        let name = decode_name(&header.name, utf8, charset);
        if name.is_empty() {
            return Err(Error::corrupt(format!("entry {index} has an empty name")));
        }

        let is_encrypted = header.flags & flags::ENCRYPTED != 0;
        let (method, aes) = if header.method == method::AES {
            let field = AesExtraField::find(&header.extra)?.ok_or_else(|| {
                Error::corrupt(format!("entry '{name}' uses AES without an AES extra field"))
            })?;
            (field.actual_method, Some(field))
        } else if is_encrypted {
            return Err(Error::UnsupportedFeature {
                feature: format!("traditional PKWARE encryption (entry '{name}')"),
            });
        } else {
            (CompressionMethod::from_id(header.method)?, None)
        };

        let comment =
            (!header.comment.is_empty()).then(|| decode_name(&header.comment, utf8, charset));
        let is_directory = name.ends_with('/') || name.ends_with('\\');

        Ok(Self {
            name,
            is_directory,
            size: u64::from(header.uncompressed_size),
            compressed_size: u64::from(header.compressed_size),
            crc32: header.crc32,
            method,
            is_encrypted: aes.is_some(),
            comment,
            modified_dos: header.modified,
            index,
            disk_start: header.disk_start,
            local_header_offset: u64::from(header.local_header_offset),
            aes,
        })
    }

    /// Returns the file name (last component of the path).
    pub fn file_name(&self) -> &str {
        self.name
            .trim_end_matches(['/', '\\'])
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.name)
    }

    /// Returns true if this is a file (not a directory).
    pub fn is_file(&self) -> bool {
        !self.is_directory
    }

    /// Returns the modification time, if the stored date is valid.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified_dos.to_system_time()
    }

    /// Whether the stored CRC-32 is meaningful (AE-2 entries store zero).
    pub(crate) fn checks_crc(&self) -> bool {
        self.aes.is_none_or(|field| field.checks_crc())
    }
}
