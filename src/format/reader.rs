//! Low-level binary reading utilities for ZIP record parsing.
//!
//! ZIP stores every integer little-endian. Records are small and are read
//! into memory whole, so parsing works on byte slices rather than streams.

use crate::{Error, Result};

/// Cursor over a byte slice that reports truncation as archive corruption.
#[derive(Debug, Clone)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> SliceReader<'a> {
    /// Creates a reader. `context` names the record for error messages.
    pub fn new(data: &'a [u8], context: &'static str) -> Self {
        Self {
            data,
            pos: 0,
            context,
        }
    }

    /// Returns the current offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Takes the next `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::corrupt(format!(
                "{} truncated at offset {}: need {} bytes, {} available",
                self.context,
                self.pos,
                len,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Reads a little-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Reads a little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a 4-byte signature and checks it.
    pub fn expect_signature(&mut self, expected: u32) -> Result<()> {
        let found = self.read_u32()?;
        if found != expected {
            return Err(Error::corrupt(format!(
                "{}: bad signature {:#010x}, expected {:#010x}",
                self.context, found, expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_integers() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xAA];
        let mut r = SliceReader::new(&data, "test");
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0x12345678);
        assert_eq!(r.position(), 6);
        assert_eq!(r.take(1).unwrap(), &[0xAA]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_truncation_is_corruption() {
        let mut r = SliceReader::new(&[1, 2, 3], "record");
        let err = r.read_u32().unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("record"));
    }

    #[test]
    fn test_signature_mismatch() {
        let mut r = SliceReader::new(&[0x50, 0x4B, 0x03, 0x04], "header");
        assert!(r.clone().expect_signature(0x04034b50).is_ok());
        assert!(r.expect_signature(0x02014b50).is_err());
    }
}
