//! Tests for passphrase handling and AES-256 encryption.
//!
//! These tests verify that:
//! - Correct passphrases decrypt every entry
//! - Wrong or missing passphrases fail with `AuthenticationFailed`
//! - No file content is written for an entry that fails authentication
//! - Tampered ciphertext is caught by the HMAC

mod common;

use std::fs;

use tempfile::TempDir;
use zipvault::crypto::{SALT_LEN, derive_keys};
use zipvault::{
    ArchiveReader, CompressionMethod, Error, ErrorKind, ExtractOptions, Password, WriteOptions,
};

use common::{text_bytes, write_tree};

fn encrypted_archive(temp: &TempDir, passphrase: &str) -> std::path::PathBuf {
    let source = temp.path().join("vault");
    write_tree(
        &source,
        &[("secret.txt", &text_bytes(5_000)), ("docs/plan.txt", b"attack at dawn")],
    );
    let options = WriteOptions::new().passphrase(passphrase);
    zipvault::create_archive(&source, "", true, &options)
        .unwrap()
        .archive_path
}

#[test]
fn test_entries_are_marked_encrypted() {
    let temp = TempDir::new().unwrap();
    let archive = encrypted_archive(&temp, "secret");

    let reader = ArchiveReader::open(&archive).unwrap();
    assert!(reader.is_encrypted());
    for entry in reader.entries() {
        // Directory entries are never encrypted
        assert_eq!(entry.is_encrypted, entry.is_file(), "{}", entry.name);
    }
}

#[test]
fn test_names_are_not_encrypted() {
    let temp = TempDir::new().unwrap();
    let archive = encrypted_archive(&temp, "secret");

    let reader = ArchiveReader::open(&archive).unwrap();
    assert_eq!(
        reader.entry_paths(),
        vec!["docs/", "docs/plan.txt", "secret.txt"]
    );
}

#[test]
fn test_content_is_not_plaintext() {
    let temp = TempDir::new().unwrap();
    let archive = encrypted_archive(&temp, "secret");

    let bytes = fs::read(&archive).unwrap();
    assert!(!bytes.windows(14).any(|w| w == b"attack at dawn"));
}

#[test]
fn test_wrong_passphrase_fails_before_writing() {
    let temp = TempDir::new().unwrap();
    let archive = encrypted_archive(&temp, "secret");
    let out = temp.path().join("out");

    let err = zipvault::extract(&archive, &out, &ExtractOptions::new().passphrase("wrong"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
    assert_eq!(err.entry_name(), Some("docs/plan.txt"));
    assert!(!out.join("docs/plan.txt").exists());
    assert!(!out.join("secret.txt").exists());
}

#[test]
fn test_verifier_collision_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("f.bin");
    fs::write(&source, text_bytes(4_000)).unwrap();
    let options = WriteOptions::new()
        .method(CompressionMethod::Stored)
        .passphrase("secret");
    let archive = zipvault::create_archive(&source, "", false, &options)
        .unwrap()
        .archive_path;

    // Make "wrong" pass the two-byte verification value, as roughly one
    // passphrase in 65536 does; only the authentication code can catch it
    let mut data = fs::read(&archive).unwrap();
    let name_len = u16::from_le_bytes([data[26], data[27]]) as usize;
    let extra_len = u16::from_le_bytes([data[28], data[29]]) as usize;
    let salt_at = 30 + name_len + extra_len;
    let salt = &data[salt_at..salt_at + SALT_LEN];
    let verifier = derive_keys(&Password::new("wrong"), salt).verifier();
    data[salt_at + SALT_LEN..salt_at + SALT_LEN + 2].copy_from_slice(&verifier);
    fs::write(&archive, &data).unwrap();

    let out = temp.path().join("out");
    let err = zipvault::extract(&archive, &out, &ExtractOptions::new().passphrase("wrong"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
    assert_eq!(err.entry_name(), Some("f.bin"));
    assert!(!out.join("f.bin").exists());
}

#[test]
fn test_missing_passphrase_fails_before_writing() {
    let temp = TempDir::new().unwrap();
    let archive = encrypted_archive(&temp, "secret");
    let out = temp.path().join("out");

    let err = zipvault::extract(&archive, &out, &ExtractOptions::new()).unwrap_err();
    assert!(err.is_authentication_error());
    assert!(!out.exists());
}

#[test]
fn test_retry_with_correct_passphrase() {
    let temp = TempDir::new().unwrap();
    let archive = encrypted_archive(&temp, "secret");
    let out = temp.path().join("out");

    let mut reader = ArchiveReader::open(&archive).unwrap();
    let err = reader
        .extract(&out, &ExtractOptions::new().passphrase("nope"))
        .unwrap_err();
    assert!(err.is_authentication_error());

    let result = reader
        .extract(&out, &ExtractOptions::new().passphrase("secret"))
        .unwrap();
    assert_eq!(result.entries_extracted, 2);
    assert_eq!(fs::read(out.join("docs/plan.txt")).unwrap(), b"attack at dawn");
}

#[test]
fn test_tampered_ciphertext_fails_authentication() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("t.txt");
    fs::write(&source, text_bytes(4_000)).unwrap();
    let options = WriteOptions::new().passphrase("secret");
    let archive = zipvault::create_archive(&source, "", false, &options)
        .unwrap()
        .archive_path;

    // Local header (30) + name "t.txt" (5) + AES extra field (11) + salt (16)
    // + verifier (2) puts the ciphertext at offset 64
    let mut bytes = fs::read(&archive).unwrap();
    bytes[70] ^= 0x01;
    fs::write(&archive, &bytes).unwrap();

    let err = zipvault::extract(
        &archive,
        temp.path().join("out"),
        &ExtractOptions::new().passphrase("secret"),
    )
    .unwrap_err();
    assert!(
        matches!(err, Error::AuthenticationFailed { .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn test_unicode_passphrase() {
    let temp = TempDir::new().unwrap();
    let archive = encrypted_archive(&temp, "пароль🔑");

    let mut reader = ArchiveReader::open(&archive).unwrap();
    let data = reader
        .extract_to_vec("docs/plan.txt", Some(&Password::new("пароль🔑")))
        .unwrap();
    assert_eq!(data, b"attack at dawn");
}
