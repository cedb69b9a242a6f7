//! Compression codec infrastructure for ZIP entries.
//!
//! Two methods are supported: `Stored` (method 0) and raw `Deflate`
//! (method 8). Encoders and decoders are plain `Write`/`Read` adapters so
//! they can be stacked with the checksum and encryption layers.

pub mod deflate;

use std::io::{self, BufReader, Read, Write};

use crate::{Error, Result};

pub use deflate::DEFAULT_LEVEL;

/// ZIP compression method identifiers.
pub mod method {
    /// No compression.
    pub const STORED: u16 = 0;
    /// Raw deflate.
    pub const DEFLATE: u16 = 8;
    /// WinZip AES envelope; the real method is in the AES extra field.
    pub const AES: u16 = 99;
}

/// Compression method applied to entry content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionMethod {
    /// Content is stored as-is.
    Stored,
    /// Content is compressed with raw deflate.
    #[default]
    Deflate,
}

impl CompressionMethod {
    /// Returns the method identifier written to headers.
    pub const fn id(self) -> u16 {
        match self {
            Self::Stored => method::STORED,
            Self::Deflate => method::DEFLATE,
        }
    }

    /// Resolves a method identifier read from a header.
    pub fn from_id(id: u16) -> Result<Self> {
        match id {
            method::STORED => Ok(Self::Stored),
            method::DEFLATE => Ok(Self::Deflate),
            other => Err(Error::UnsupportedFeature {
                feature: format!("compression method {other}"),
            }),
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored => f.write_str("Stored"),
            Self::Deflate => f.write_str("Deflate"),
        }
    }
}

/// Compressing writer for one entry.
pub enum EntryEncoder<W: Write> {
    /// Pass-through.
    Stored(W),
    /// Deflate compression.
    Deflate(deflate::DeflateEncoder<W>),
}

impl<W: Write> EntryEncoder<W> {
    /// Creates an encoder for the given method and level.
    pub fn new(method: CompressionMethod, level: u32, output: W) -> Self {
        match method {
            CompressionMethod::Stored => Self::Stored(output),
            CompressionMethod::Deflate => {
                Self::Deflate(deflate::DeflateEncoder::new(output, level))
            }
        }
    }

    /// Flushes any pending compressed data and returns the output writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Stored(w) => Ok(w),
            Self::Deflate(enc) => enc.try_finish(),
        }
    }
}

impl<W: Write> Write for EntryEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stored(w) => w.write(buf),
            Self::Deflate(enc) => enc.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stored(w) => w.flush(),
            Self::Deflate(enc) => enc.flush(),
        }
    }
}

/// Builds a decompressing reader over an entry's (decrypted) payload.
pub fn build_decoder<'a, R: Read + 'a>(method: CompressionMethod, input: R) -> Box<dyn Read + 'a> {
    match method {
        CompressionMethod::Stored => Box::new(input),
        CompressionMethod::Deflate => Box::new(deflate::DeflateDecoder::new(BufReader::new(input))),
    }
}
