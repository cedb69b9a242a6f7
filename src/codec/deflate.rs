//! Deflate codec implementation.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::bufread::DeflateDecoder as FlateDecoder;
use flate2::write::DeflateEncoder as FlateEncoder;

/// Default compression level ("normal").
pub const DEFAULT_LEVEL: u32 = 6;

/// Raw deflate decoder.
pub struct DeflateDecoder<R> {
    inner: FlateDecoder<R>,
}

impl<R> std::fmt::Debug for DeflateDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateDecoder").finish_non_exhaustive()
    }
}

impl<R: io::BufRead> DeflateDecoder<R> {
    /// Creates a new Deflate decoder over buffered compressed input.
    pub fn new(input: R) -> Self {
        Self {
            inner: FlateDecoder::new(input),
        }
    }
}

impl<R: io::BufRead> Read for DeflateDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Raw deflate encoder.
pub struct DeflateEncoder<W: Write> {
    inner: FlateEncoder<W>,
}

impl<W: Write> std::fmt::Debug for DeflateEncoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateEncoder").finish_non_exhaustive()
    }
}

impl<W: Write> DeflateEncoder<W> {
    /// Creates a new Deflate encoder. Levels above 9 are clamped.
    pub fn new(output: W, level: u32) -> Self {
        Self {
            inner: FlateEncoder::new(output, Compression::new(level.min(9))),
        }
    }

    /// Finishes encoding and returns the underlying writer.
    pub fn try_finish(self) -> io::Result<W> {
        self.inner.finish()
    }
}

impl<W: Write> Write for DeflateEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    #[test]
    fn test_deflate_roundtrip() {
        let data = b"Hello, World! This is a test of Deflate compression.";

        let mut encoder = DeflateEncoder::new(Vec::new(), DEFAULT_LEVEL);
        encoder.write_all(data).unwrap();
        let compressed = encoder.try_finish().unwrap();

        let reader = BufReader::new(Cursor::new(&compressed));
        let mut decoder = DeflateDecoder::new(reader);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();

        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_deflate_level_zero_still_decodes() {
        let data = vec![7u8; 10_000];
        let mut encoder = DeflateEncoder::new(Vec::new(), 0);
        encoder.write_all(&data).unwrap();
        let compressed = encoder.try_finish().unwrap();
        assert!(compressed.len() > data.len());

        let mut decoder = DeflateDecoder::new(&compressed[..]);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_deflate_garbage_is_error() {
        let garbage = [0xFFu8; 64];
        let mut decoder = DeflateDecoder::new(&garbage[..]);
        let mut out = Vec::new();
        assert!(decoder.read_to_end(&mut out).is_err());
    }
}
