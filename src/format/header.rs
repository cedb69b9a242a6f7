//! ZIP record encoding and parsing.

use super::reader::SliceReader;
use super::{
    CENTRAL_HEADER_LEN, DATA_DESCRIPTOR_LEN, EOCD_LEN, LOCAL_HEADER_LEN, MAX_U16, MAX_U32,
    signature,
};
use crate::timestamp::DosDateTime;
use crate::{Error, Result};

/// Local file header preceding each entry's payload.
///
/// Written with the data descriptor flag set, so the CRC and size fields
/// are zero and the real values follow the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    /// Version needed to extract.
    pub version_needed: u16,
    /// General purpose flags.
    pub flags: u16,
    /// Compression method (99 for AES).
    pub method: u16,
    /// Modification time.
    pub modified: DosDateTime,
    /// CRC-32 (zero when a data descriptor follows).
    pub crc32: u32,
    /// Compressed size (zero when a data descriptor follows).
    pub compressed_size: u32,
    /// Uncompressed size (zero when a data descriptor follows).
    pub uncompressed_size: u32,
    /// Raw name bytes.
    pub name: Vec<u8>,
    /// Extra field block.
    pub extra: Vec<u8>,
}

impl LocalFileHeader {
    /// Total encoded length.
    pub fn encoded_len(&self) -> usize {
        LOCAL_HEADER_LEN + self.name.len() + self.extra.len()
    }

    /// Encodes the header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&signature::LOCAL_FILE_HEADER.to_le_bytes());
        out.extend_from_slice(&self.version_needed.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.method.to_le_bytes());
        out.extend_from_slice(&self.modified.time.to_le_bytes());
        out.extend_from_slice(&self.modified.date.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&self.extra);
        out
    }

    /// Parses the fixed 30-byte part and returns the length of the name and
    /// extra field that follow it.
    pub fn trailing_len(fixed: &[u8]) -> Result<u64> {
        let mut r = SliceReader::new(fixed, "local file header");
        r.expect_signature(signature::LOCAL_FILE_HEADER)?;
        r.take(22)?;
        let name_len = r.read_u16()?;
        let extra_len = r.read_u16()?;
        Ok(u64::from(name_len) + u64::from(extra_len))
    }
}

/// Data descriptor trailing an entry payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    /// CRC-32 of the uncompressed content.
    pub crc32: u32,
    /// Payload size.
    pub compressed_size: u32,
    /// Content size.
    pub uncompressed_size: u32,
}

impl DataDescriptor {
    /// Encodes the descriptor with its optional signature.
    pub fn to_bytes(&self) -> [u8; DATA_DESCRIPTOR_LEN] {
        let mut out = [0u8; DATA_DESCRIPTOR_LEN];
        out[0..4].copy_from_slice(&signature::DATA_DESCRIPTOR.to_le_bytes());
        out[4..8].copy_from_slice(&self.crc32.to_le_bytes());
        out[8..12].copy_from_slice(&self.compressed_size.to_le_bytes());
        out[12..16].copy_from_slice(&self.uncompressed_size.to_le_bytes());
        out
    }
}

/// Central directory file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    /// Version made by.
    pub version_made_by: u16,
    /// Version needed to extract.
    pub version_needed: u16,
    /// General purpose flags.
    pub flags: u16,
    /// Compression method (99 for AES).
    pub method: u16,
    /// Modification time.
    pub modified: DosDateTime,
    /// CRC-32 of the uncompressed content.
    pub crc32: u32,
    /// Payload size.
    pub compressed_size: u32,
    /// Content size.
    pub uncompressed_size: u32,
    /// Disk (volume) holding the local header.
    pub disk_start: u16,
    /// Internal attributes.
    pub internal_attributes: u16,
    /// External attributes (Unix mode in the high 16 bits).
    pub external_attributes: u32,
    /// Offset of the local header within its disk.
    pub local_header_offset: u32,
    /// Raw name bytes.
    pub name: Vec<u8>,
    /// Extra field block.
    pub extra: Vec<u8>,
    /// Raw comment bytes.
    pub comment: Vec<u8>,
}

impl CentralDirectoryHeader {
    /// Total encoded length.
    pub fn encoded_len(&self) -> usize {
        CENTRAL_HEADER_LEN + self.name.len() + self.extra.len() + self.comment.len()
    }

    /// Encodes the header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&signature::CENTRAL_DIRECTORY.to_le_bytes());
        out.extend_from_slice(&self.version_made_by.to_le_bytes());
        out.extend_from_slice(&self.version_needed.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.method.to_le_bytes());
        out.extend_from_slice(&self.modified.time.to_le_bytes());
        out.extend_from_slice(&self.modified.date.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.disk_start.to_le_bytes());
        out.extend_from_slice(&self.internal_attributes.to_le_bytes());
        out.extend_from_slice(&self.external_attributes.to_le_bytes());
        out.extend_from_slice(&self.local_header_offset.to_le_bytes());
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&self.extra);
        out.extend_from_slice(&self.comment);
        out
    }

    /// Parses one header from the central directory.
    pub fn parse(r: &mut SliceReader<'_>) -> Result<Self> {
        r.expect_signature(signature::CENTRAL_DIRECTORY)?;
        let version_made_by = r.read_u16()?;
        let version_needed = r.read_u16()?;
        let flags = r.read_u16()?;
        let method = r.read_u16()?;
        let time = r.read_u16()?;
        let date = r.read_u16()?;
        let crc32 = r.read_u32()?;
        let compressed_size = r.read_u32()?;
        let uncompressed_size = r.read_u32()?;
        let name_len = r.read_u16()? as usize;
        let extra_len = r.read_u16()? as usize;
        let comment_len = r.read_u16()? as usize;
        let disk_start = r.read_u16()?;
        let internal_attributes = r.read_u16()?;
        let external_attributes = r.read_u32()?;
        let local_header_offset = r.read_u32()?;
        let name = r.take(name_len)?.to_vec();
        let extra = r.take(extra_len)?.to_vec();
        let comment = r.take(comment_len)?.to_vec();

        let header = Self {
            version_made_by,
            version_needed,
            flags,
            method,
            modified: DosDateTime::new(time, date),
            crc32,
            compressed_size,
            uncompressed_size,
            disk_start,
            internal_attributes,
            external_attributes,
            local_header_offset,
            name,
            extra,
            comment,
        };
        if header.needs_zip64() {
            return Err(Error::UnsupportedFeature {
                feature: "ZIP64 entry".into(),
            });
        }
        Ok(header)
    }

    fn needs_zip64(&self) -> bool {
        u64::from(self.compressed_size) == MAX_U32
            || u64::from(self.uncompressed_size) == MAX_U32
            || u64::from(self.local_header_offset) == MAX_U32
            || u64::from(self.disk_start) == MAX_U16
    }
}

/// End of central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Number of this disk (the last volume).
    pub disk_number: u16,
    /// Disk where the central directory starts.
    pub central_directory_disk: u16,
    /// Number of central directory records on this disk.
    pub entries_on_disk: u16,
    /// Total number of central directory records.
    pub entries_total: u16,
    /// Size of the central directory.
    pub central_directory_size: u32,
    /// Offset of the central directory within its disk.
    pub central_directory_offset: u32,
    /// Raw archive comment.
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    /// Encodes the record.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(EOCD_LEN + self.comment.len());
        out.extend_from_slice(&signature::END_OF_CENTRAL_DIRECTORY.to_le_bytes());
        out.extend_from_slice(&self.disk_number.to_le_bytes());
        out.extend_from_slice(&self.central_directory_disk.to_le_bytes());
        out.extend_from_slice(&self.entries_on_disk.to_le_bytes());
        out.extend_from_slice(&self.entries_total.to_le_bytes());
        out.extend_from_slice(&self.central_directory_size.to_le_bytes());
        out.extend_from_slice(&self.central_directory_offset.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);
        out
    }

    /// Finds and parses the record in the tail of the final volume.
    ///
    /// `tail` must hold the last `EOCD_LEN + 65535` bytes of the file (or
    /// the whole file if shorter). The record is located by scanning
    /// backwards for a signature whose comment length reaches exactly to
    /// the end of the data.
    pub fn find(tail: &[u8]) -> Result<Self> {
        if tail.len() < EOCD_LEN {
            return Err(Error::corrupt(
                "file is too small to hold an end of central directory record",
            ));
        }

        let sig = signature::END_OF_CENTRAL_DIRECTORY.to_le_bytes();
        for start in (0..=tail.len() - EOCD_LEN).rev() {
            if tail[start..start + 4] != sig {
                continue;
            }
            let comment_len = u16::from_le_bytes([tail[start + 20], tail[start + 21]]) as usize;
            if start + EOCD_LEN + comment_len != tail.len() {
                continue;
            }
            let record = Self::parse(&tail[start..])?;
            if start >= 20 {
                let locator = u32::from_le_bytes([
                    tail[start - 20],
                    tail[start - 19],
                    tail[start - 18],
                    tail[start - 17],
                ]);
                if locator == signature::ZIP64_LOCATOR {
                    return Err(Error::UnsupportedFeature {
                        feature: "ZIP64 end of central directory".into(),
                    });
                }
            }
            return Ok(record);
        }

        Err(Error::corrupt("end of central directory record not found"))
    }

    fn parse(data: &[u8]) -> Result<Self> {
        let mut r = SliceReader::new(data, "end of central directory");
        r.expect_signature(signature::END_OF_CENTRAL_DIRECTORY)?;
        let disk_number = r.read_u16()?;
        let central_directory_disk = r.read_u16()?;
        let entries_on_disk = r.read_u16()?;
        let entries_total = r.read_u16()?;
        let central_directory_size = r.read_u32()?;
        let central_directory_offset = r.read_u32()?;
        let comment_len = r.read_u16()? as usize;
        let comment = r.take(comment_len)?.to_vec();

        if u64::from(entries_total) == MAX_U16
            || u64::from(central_directory_size) == MAX_U32
            || u64::from(central_directory_offset) == MAX_U32
        {
            return Err(Error::UnsupportedFeature {
                feature: "ZIP64 archive".into(),
            });
        }

        Ok(Self {
            disk_number,
            central_directory_disk,
            entries_on_disk,
            entries_total,
            central_directory_size,
            central_directory_offset,
            comment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_central() -> CentralDirectoryHeader {
        CentralDirectoryHeader {
            version_made_by: super::super::VERSION_MADE_BY,
            version_needed: 20,
            flags: 0x0808,
            method: 8,
            modified: DosDateTime::MIN,
            crc32: 0xDEADBEEF,
            compressed_size: 100,
            uncompressed_size: 250,
            disk_start: 1,
            internal_attributes: 0,
            external_attributes: 0o100644 << 16,
            local_header_offset: 4,
            name: b"dir/file.txt".to_vec(),
            extra: Vec::new(),
            comment: b"note".to_vec(),
        }
    }

    #[test]
    fn test_local_header_layout() {
        let header = LocalFileHeader {
            version_needed: 20,
            flags: 0x0008,
            method: 8,
            modified: DosDateTime::MIN,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            name: b"a.txt".to_vec(),
            extra: vec![1, 2, 3],
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), header.encoded_len());
        assert_eq!(&bytes[..4], b"PK\x03\x04");
        assert_eq!(&bytes[30..35], b"a.txt");
        assert_eq!(LocalFileHeader::trailing_len(&bytes[..30]).unwrap(), 8);
    }

    #[test]
    fn test_local_header_bad_signature() {
        let bytes = [0u8; 30];
        assert!(LocalFileHeader::trailing_len(&bytes).unwrap_err().is_corruption());
    }

    #[test]
    fn test_data_descriptor_layout() {
        let dd = DataDescriptor {
            crc32: 0x11223344,
            compressed_size: 5,
            uncompressed_size: 6,
        };
        let bytes = dd.to_bytes();
        assert_eq!(&bytes[..4], b"PK\x07\x08");
        assert_eq!(&bytes[4..8], &[0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn test_central_header_parse() {
        let header = sample_central();
        let bytes = header.to_bytes();
        let mut r = SliceReader::new(&bytes, "central directory");
        assert_eq!(CentralDirectoryHeader::parse(&mut r).unwrap(), header);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_central_header_zip64_marker_rejected() {
        let mut header = sample_central();
        header.compressed_size = u32::MAX;
        let bytes = header.to_bytes();
        let mut r = SliceReader::new(&bytes, "central directory");
        assert!(matches!(
            CentralDirectoryHeader::parse(&mut r),
            Err(Error::UnsupportedFeature { .. })
        ));
    }

    #[test]
    fn test_eocd_find_with_comment() {
        let eocd = EndOfCentralDirectory {
            disk_number: 2,
            central_directory_disk: 2,
            entries_on_disk: 3,
            entries_total: 3,
            central_directory_size: 150,
            central_directory_offset: 1000,
            comment: b"archive comment".to_vec(),
        };
        let mut data = vec![0xAAu8; 64];
        data.extend_from_slice(&eocd.to_bytes());

        assert_eq!(EndOfCentralDirectory::find(&data).unwrap(), eocd);
    }

    #[test]
    fn test_eocd_missing() {
        let data = vec![0u8; 100];
        assert!(EndOfCentralDirectory::find(&data).unwrap_err().is_corruption());
        assert!(EndOfCentralDirectory::find(&[0u8; 5]).is_err());
    }

    #[test]
    fn test_eocd_truncated_comment_not_matched() {
        let eocd = EndOfCentralDirectory {
            disk_number: 0,
            central_directory_disk: 0,
            entries_on_disk: 0,
            entries_total: 0,
            central_directory_size: 0,
            central_directory_offset: 0,
            comment: b"long comment".to_vec(),
        };
        let bytes = eocd.to_bytes();
        assert!(EndOfCentralDirectory::find(&bytes[..bytes.len() - 3]).is_err());
    }
}
