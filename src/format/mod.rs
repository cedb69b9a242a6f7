//! ZIP container format constants, record definitions and low-level parsing.
//!
//! An archive is a sequence of `{local header, entry payload, data
//! descriptor}` blocks followed by the central directory and the end of
//! central directory record. Split archives carry the same byte stream cut
//! into volumes.

pub mod charset;
pub mod header;
pub mod reader;

pub use charset::Charset;

/// Record signatures.
pub mod signature {
    /// Local file header.
    pub const LOCAL_FILE_HEADER: u32 = 0x04034b50;
    /// Data descriptor.
    pub const DATA_DESCRIPTOR: u32 = 0x08074b50;
    /// Central directory file header.
    pub const CENTRAL_DIRECTORY: u32 = 0x02014b50;
    /// End of central directory record.
    pub const END_OF_CENTRAL_DIRECTORY: u32 = 0x06054b50;
    /// ZIP64 end of central directory locator.
    pub const ZIP64_LOCATOR: u32 = 0x07064b50;
}

/// General purpose bit flags.
pub mod flags {
    /// Entry is encrypted.
    pub const ENCRYPTED: u16 = 1 << 0;
    /// CRC and sizes follow the data in a data descriptor.
    pub const DATA_DESCRIPTOR: u16 = 1 << 3;
    /// Name and comment are UTF-8.
    pub const UTF8: u16 = 1 << 11;
}

/// Version needed to extract a plain stored or deflated entry (2.0).
pub const VERSION_NEEDED_DEFAULT: u16 = 20;

/// Version needed to extract a WinZip AES entry (5.1).
pub const VERSION_NEEDED_AES: u16 = 51;

/// Version made by: Unix host, specification 6.3.
pub const VERSION_MADE_BY: u16 = (3 << 8) | 63;

/// Fixed size of a local file header.
pub const LOCAL_HEADER_LEN: usize = 30;

/// Size of a data descriptor including its signature.
pub const DATA_DESCRIPTOR_LEN: usize = 16;

/// Fixed size of a central directory header.
pub const CENTRAL_HEADER_LEN: usize = 46;

/// Fixed size of the end of central directory record.
pub const EOCD_LEN: usize = 22;

/// Largest value a 16-bit field can carry.
pub const MAX_U16: u64 = u16::MAX as u64;

/// Largest value a 32-bit field can carry without ZIP64.
pub const MAX_U32: u64 = u32::MAX as u64;

/// Unix mode bits stored in the external attributes of regular files.
pub const UNIX_FILE_MODE: u32 = 0o100644;

/// Unix mode bits stored in the external attributes of directories.
pub const UNIX_DIR_MODE: u32 = 0o040755;

/// MS-DOS directory attribute.
pub const DOS_DIRECTORY_ATTRIBUTE: u32 = 0x10;
