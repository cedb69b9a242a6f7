//! WinZip AES extra field parsing and encoding.

use crate::codec::CompressionMethod;
use crate::{Error, Result};

/// Header ID of the WinZip AES extra field.
pub const AES_EXTRA_FIELD_ID: u16 = 0x9901;

/// Size of the extra field payload (without the 4-byte ID/size prefix).
pub const AES_EXTRA_FIELD_DATA_LEN: u16 = 7;

/// Encoded size of the field including its ID/size prefix.
pub const AES_EXTRA_FIELD_LEN: usize = 4 + AES_EXTRA_FIELD_DATA_LEN as usize;

/// Vendor version AE-1: the plaintext CRC-32 is stored and checked.
pub const VENDOR_VERSION_AE1: u16 = 1;

/// Vendor version AE-2: the CRC-32 field is zero.
pub const VENDOR_VERSION_AE2: u16 = 2;

/// Key strength code for AES-256.
pub const STRENGTH_AES256: u8 = 3;

/// Parsed WinZip AES extra field.
///
/// Layout of the 7 data bytes:
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0 | 2 | vendor version (1 or 2) |
/// | 2 | 2 | vendor id `AE` |
/// | 4 | 1 | key strength (3 = AES-256) |
/// | 5 | 2 | actual compression method |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesExtraField {
    /// AE-1 or AE-2.
    pub vendor_version: u16,
    /// Compression applied before encryption.
    pub actual_method: CompressionMethod,
}

impl AesExtraField {
    /// Creates an AE-1, AES-256 field.
    pub fn new(actual_method: CompressionMethod) -> Self {
        Self {
            vendor_version: VENDOR_VERSION_AE1,
            actual_method,
        }
    }

    /// Encodes the field including its 4-byte ID/size prefix.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(AES_EXTRA_FIELD_LEN);
        out.extend_from_slice(&AES_EXTRA_FIELD_ID.to_le_bytes());
        out.extend_from_slice(&AES_EXTRA_FIELD_DATA_LEN.to_le_bytes());
        out.extend_from_slice(&self.vendor_version.to_le_bytes());
        out.extend_from_slice(b"AE");
        out.push(STRENGTH_AES256);
        out.extend_from_slice(&self.actual_method.id().to_le_bytes());
        out
    }

    /// Parses the 7 data bytes of the field.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < AES_EXTRA_FIELD_DATA_LEN as usize {
            return Err(Error::corrupt(format!(
                "AES extra field too short: {} bytes",
                data.len()
            )));
        }

        let vendor_version = u16::from_le_bytes([data[0], data[1]]);
        if vendor_version != VENDOR_VERSION_AE1 && vendor_version != VENDOR_VERSION_AE2 {
            return Err(Error::UnsupportedFeature {
                feature: format!("AES vendor version {vendor_version}"),
            });
        }
        if &data[2..4] != b"AE" {
            return Err(Error::corrupt("AES extra field has wrong vendor id"));
        }
        if data[4] != STRENGTH_AES256 {
            return Err(Error::UnsupportedFeature {
                feature: format!("AES key strength {}", data[4]),
            });
        }
        let actual_method = CompressionMethod::from_id(u16::from_le_bytes([data[5], data[6]]))?;

        Ok(Self {
            vendor_version,
            actual_method,
        })
    }

    /// Searches an extra field block for the AES field.
    pub fn find(extra: &[u8]) -> Result<Option<Self>> {
        let mut pos = 0;
        while pos + 4 <= extra.len() {
            let id = u16::from_le_bytes([extra[pos], extra[pos + 1]]);
            let size = u16::from_le_bytes([extra[pos + 2], extra[pos + 3]]) as usize;
            let start = pos + 4;
            let end = start + size;
            if end > extra.len() {
                return Err(Error::corrupt("extra field overruns its block"));
            }
            if id == AES_EXTRA_FIELD_ID {
                return Self::parse(&extra[start..end]).map(Some);
            }
            pos = end;
        }
        Ok(None)
    }

    /// Returns true if the stored CRC-32 should be verified.
    pub fn checks_crc(&self) -> bool {
        self.vendor_version == VENDOR_VERSION_AE1
    }
}
