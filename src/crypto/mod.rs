//! WinZip AES-256 encryption support.
//!
//! This module implements the AE-1 envelope used by ZIP archives:
//! - PBKDF2-HMAC-SHA1 key derivation (1000 iterations) from a random salt
//! - AES-256 in CTR mode with a little-endian counter starting at 1
//! - HMAC-SHA1 over the ciphertext, truncated to 10 bytes
//!
//! The entry payload is laid out as
//! `salt (16) | verification value (2) | ciphertext | authentication code (10)`.
//! The verification value lets a reader reject a wrong passphrase before any
//! data is decrypted; the authentication code detects tampering once the
//! whole ciphertext has been consumed.

mod password;
mod properties;

use std::io::{self, Read, Write};

use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::{Error, Result};

pub use password::Password;
pub use properties::{AES_EXTRA_FIELD_ID, AES_EXTRA_FIELD_LEN, AesExtraField};

type Aes256Ctr = ctr::Ctr128LE<aes::Aes256>;
type HmacSha1 = Hmac<Sha1>;

/// Salt length for AES-256.
pub const SALT_LEN: usize = 16;

/// Length of the password verification value.
pub const VERIFIER_LEN: usize = 2;

/// Length of the truncated HMAC-SHA1 authentication code.
pub const AUTH_CODE_LEN: usize = 10;

/// Bytes the envelope adds to an entry's compressed size.
pub const ENVELOPE_OVERHEAD: u64 = (SALT_LEN + VERIFIER_LEN + AUTH_CODE_LEN) as u64;

/// PBKDF2 iteration count fixed by the WinZip AES format.
pub const KEY_DERIVATION_ITERATIONS: u32 = 1000;

const KEY_LEN: usize = 32;

/// Counter block for the first AES block: little-endian 1.
const INITIAL_COUNTER: [u8; 16] = [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// Key material for one entry.
///
/// Keys are wiped when dropped.
pub struct DerivedKeys {
    encryption_key: Zeroizing<[u8; KEY_LEN]>,
    authentication_key: Zeroizing<[u8; KEY_LEN]>,
    verifier: [u8; VERIFIER_LEN],
}

impl std::fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeys").finish_non_exhaustive()
    }
}

impl DerivedKeys {
    /// Returns the password verification value.
    pub fn verifier(&self) -> [u8; VERIFIER_LEN] {
        self.verifier
    }

    fn cipher(&self) -> io::Result<Aes256Ctr> {
        Aes256Ctr::new_from_slices(&self.encryption_key[..], &INITIAL_COUNTER)
            .map_err(|e| io::Error::other(e.to_string()))
    }

    fn mac(&self) -> io::Result<HmacSha1> {
        HmacSha1::new_from_slice(&self.authentication_key[..])
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

/// Derives the encryption key, authentication key and verification value
/// for a password and salt.
pub fn derive_keys(password: &Password, salt: &[u8]) -> DerivedKeys {
    let mut material = Zeroizing::new([0u8; 2 * KEY_LEN + VERIFIER_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha1>(
        password.as_bytes(),
        salt,
        KEY_DERIVATION_ITERATIONS,
        &mut material[..],
    );

    let mut encryption_key = Zeroizing::new([0u8; KEY_LEN]);
    let mut authentication_key = Zeroizing::new([0u8; KEY_LEN]);
    encryption_key.copy_from_slice(&material[..KEY_LEN]);
    authentication_key.copy_from_slice(&material[KEY_LEN..2 * KEY_LEN]);
    let verifier = [material[2 * KEY_LEN], material[2 * KEY_LEN + 1]];

    DerivedKeys {
        encryption_key,
        authentication_key,
        verifier,
    }
}

/// Generates a random salt from the operating system RNG.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt).map_err(|e| {
        Error::Io(io::Error::other(format!(
            "failed to generate random salt: {e}"
        )))
    })?;
    Ok(salt)
}

/// Encrypting writer producing a complete AE payload.
///
/// The salt and verification value are written on construction; the
/// authentication code is written by [`finish`](Self::finish). Dropping the
/// writer without calling `finish` leaves an unauthenticated payload.
pub struct AesEncryptingWriter<W> {
    inner: W,
    cipher: Aes256Ctr,
    mac: HmacSha1,
    scratch: Vec<u8>,
}

impl<W> std::fmt::Debug for AesEncryptingWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesEncryptingWriter").finish_non_exhaustive()
    }
}

impl<W: Write> AesEncryptingWriter<W> {
    /// Creates an encrypting writer with a fresh random salt.
    pub fn new(output: W, password: &Password) -> Result<Self> {
        let salt = generate_salt()?;
        Self::with_salt(output, password, &salt)
    }

    /// Creates an encrypting writer with an explicit salt.
    pub fn with_salt(mut output: W, password: &Password, salt: &[u8; SALT_LEN]) -> Result<Self> {
        let keys = derive_keys(password, salt);
        output.write_all(salt)?;
        output.write_all(&keys.verifier)?;

        Ok(Self {
            inner: output,
            cipher: keys.cipher()?,
            mac: keys.mac()?,
            scratch: Vec::new(),
        })
    }

    /// Writes the authentication code and returns the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        let tag = self.mac.finalize().into_bytes();
        self.inner.write_all(&tag[..AUTH_CODE_LEN])?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for AesEncryptingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        self.cipher.apply_keystream(&mut self.scratch);
        self.mac.update(&self.scratch);
        self.inner.write_all(&self.scratch)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decrypting reader over a complete AE payload.
///
/// Construction reads the salt and verification value and fails with
/// [`Error::AuthenticationFailed`] if the passphrase does not match, before
/// any ciphertext is consumed. Reading yields plaintext and stops before the
/// authentication code; [`finish`](Self::finish) verifies it.
pub struct AesDecryptingReader<R> {
    inner: R,
    cipher: Aes256Ctr,
    mac: HmacSha1,
    remaining: u64,
}

impl<R> std::fmt::Debug for AesDecryptingReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesDecryptingReader")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

impl<R: Read> AesDecryptingReader<R> {
    /// Opens an AE payload of `payload_len` bytes (the entry's compressed size).
    pub fn new(mut input: R, password: &Password, payload_len: u64) -> Result<Self> {
        if payload_len < ENVELOPE_OVERHEAD {
            return Err(Error::corrupt(format!(
                "encrypted payload of {payload_len} bytes is shorter than the AES envelope"
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        let mut stored_verifier = [0u8; VERIFIER_LEN];
        input
            .read_exact(&mut salt)
            .and_then(|()| input.read_exact(&mut stored_verifier))
            .map_err(crate::error::map_io_error)?;

        let keys = derive_keys(password, &salt);
        if keys.verifier != stored_verifier {
            log::debug!("AES password verification value mismatch");
            return Err(Error::authentication_failed(None, "wrong passphrase"));
        }

        Ok(Self {
            inner: input,
            cipher: keys.cipher()?,
            mac: keys.mac()?,
            remaining: payload_len - ENVELOPE_OVERHEAD,
        })
    }

    /// Consumes any unread ciphertext and verifies the authentication code.
    pub fn finish(mut self) -> Result<()> {
        io::copy(&mut self, &mut io::sink()).map_err(crate::error::map_io_error)?;
        self.verify_tag()
    }

    /// Verifies the authentication code over the unread ciphertext without
    /// decrypting it.
    ///
    /// Readers use this as a first pass so that a passphrase which only
    /// collides with the verification value is rejected before any
    /// plaintext leaves the envelope.
    pub fn authenticate(mut self) -> Result<()> {
        let mut buf = [0u8; 8192];
        while self.remaining > 0 {
            let limit = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
            let n = self
                .inner
                .read(&mut buf[..limit])
                .map_err(crate::error::map_io_error)?;
            if n == 0 {
                return Err(Error::corrupt("encrypted payload ended early"));
            }
            self.mac.update(&buf[..n]);
            self.remaining -= n as u64;
        }
        self.verify_tag()
    }

    fn verify_tag(mut self) -> Result<()> {
        let mut tag = [0u8; AUTH_CODE_LEN];
        self.inner
            .read_exact(&mut tag)
            .map_err(crate::error::map_io_error)?;

        self.mac
            .verify_truncated_left(&tag)
            .map_err(|_| Error::authentication_failed(None, "authentication code mismatch"))
    }
}

impl<R: Read> Read for AesDecryptingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let limit = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..limit])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "encrypted payload ended early",
            ));
        }

        self.mac.update(&buf[..n]);
        self.cipher.apply_keystream(&mut buf[..n]);
        self.remaining -= n as u64;
        Ok(n)
    }
}
