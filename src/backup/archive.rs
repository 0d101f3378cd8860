//! Snapshot serialization and encryption-at-rest.
//!
//! Encrypted files use the framing `magic "FCBK" || nonce(12) || tag(16) ||
//! ciphertext`, with AES-256-GCM over the UTF-8 JSON document. Without a
//! configured key, plaintext JSON is written. Reading sniffs the magic marker
//! and verifies the authentication tag before trusting any plaintext.

use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use chrono::{SecondsFormat, Utc};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::errors::AppError;
use crate::models::{Snapshot, StoredSnapshot};

/// Magic marker prefixing encrypted snapshot files.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"FCBK";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// File extension for plaintext snapshots.
pub const PLAIN_EXT: &str = "json";
/// File extension for encrypted snapshots.
pub const SEALED_EXT: &str = "fcbk";

/// Serialize a snapshot and write it into `dir`, encrypted when a key is
/// given. The write goes through a temporary file and a rename, so a failed
/// attempt leaves no partial snapshot behind.
///
/// Filenames embed the creation timestamp with `:` and `.` replaced for
/// filesystem safety; same-second collisions are last-write-wins.
pub async fn persist_snapshot(
    snapshot: &Snapshot,
    dir: &Path,
    key: Option<&str>,
) -> Result<StoredSnapshot, AppError> {
    let document = serde_json::to_vec(snapshot)
        .map_err(|e| AppError::Internal(format!("snapshot serialization failed: {}", e)))?;

    let (bytes, ext) = match key {
        Some(key) => (seal_frame(&document, key.as_bytes())?, SEALED_EXT),
        None => (document, PLAIN_EXT),
    };

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.{}", file_stem_now(), ext));
    let tmp = path.with_extension("tmp");

    if let Err(err) = tokio::fs::write(&tmp, &bytes).await {
        tokio::fs::remove_file(&tmp).await.ok();
        return Err(err.into());
    }
    tokio::fs::rename(&tmp, &path).await?;

    Ok(StoredSnapshot {
        path: path.display().to_string(),
        size_bytes: bytes.len() as u64,
    })
}

/// Read a persisted snapshot back, decrypting when the file carries the
/// magic marker. Files without the marker are parsed as plaintext JSON.
pub async fn read_snapshot(path: &Path, key: Option<&str>) -> Result<Snapshot, AppError> {
    let bytes = tokio::fs::read(path).await?;

    let document = if bytes.starts_with(SNAPSHOT_MAGIC) {
        let key = key.ok_or_else(|| {
            AppError::Crypto("snapshot is encrypted but no backup key is configured".to_string())
        })?;
        open_frame(&bytes, key.as_bytes())?
    } else {
        bytes
    };

    Ok(serde_json::from_slice(&document)?)
}

/// Encrypt a JSON document into the on-disk frame with a fresh random nonce.
pub fn seal_frame(document: &[u8], key: &[u8]) -> Result<Vec<u8>, AppError> {
    let cipher = cipher_for(key)?;
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), document)
        .map_err(|_| AppError::Crypto("snapshot encryption failed".to_string()))?;
    // aes-gcm appends the tag to the ciphertext; the frame carries it up front
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let mut frame = Vec::with_capacity(SNAPSHOT_MAGIC.len() + NONCE_LEN + TAG_LEN + ciphertext.len());
    frame.extend_from_slice(SNAPSHOT_MAGIC);
    frame.extend_from_slice(&nonce);
    frame.extend_from_slice(tag);
    frame.extend_from_slice(ciphertext);
    Ok(frame)
}

/// Verify and decrypt an on-disk frame back into the JSON document.
pub fn open_frame(frame: &[u8], key: &[u8]) -> Result<Vec<u8>, AppError> {
    const HEADER_LEN: usize = 4 + NONCE_LEN + TAG_LEN;
    if frame.len() < HEADER_LEN || &frame[..4] != SNAPSHOT_MAGIC {
        return Err(AppError::Crypto("not a valid encrypted snapshot".to_string()));
    }

    let nonce = &frame[4..4 + NONCE_LEN];
    let tag = &frame[4 + NONCE_LEN..HEADER_LEN];
    let ciphertext = &frame[HEADER_LEN..];

    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    let cipher = cipher_for(key)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed.as_slice())
        .map_err(|_| AppError::Crypto("snapshot authentication failed".to_string()))
}

/// Build the AES-256-GCM cipher from a key of at least 32 bytes, truncated
/// to exactly 32.
fn cipher_for(key: &[u8]) -> Result<Aes256Gcm, AppError> {
    if key.len() < KEY_LEN {
        return Err(AppError::Crypto(format!(
            "backup key must be at least {} bytes",
            KEY_LEN
        )));
    }
    Aes256Gcm::new_from_slice(&key[..KEY_LEN])
        .map_err(|_| AppError::Crypto("backup key rejected by cipher".to_string()))
}

fn file_stem_now() -> String {
    let stamp = Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("snapshot-{}", stamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn test_frame_round_trip() {
        let document = br#"{"meta":{"createdAt":"2025-01-01T00:00:00Z","version":"1.0"}}"#;
        let frame = seal_frame(document, KEY).unwrap();

        assert_eq!(&frame[..4], SNAPSHOT_MAGIC);
        assert!(frame.len() >= 4 + NONCE_LEN + TAG_LEN + document.len());

        let opened = open_frame(&frame, KEY).unwrap();
        assert_eq!(opened, document);
    }

    #[test]
    fn test_frame_rejects_tamper() {
        let frame = seal_frame(b"{}", KEY).unwrap();
        let mut tampered = frame.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;

        assert!(matches!(
            open_frame(&tampered, KEY),
            Err(AppError::Crypto(_))
        ));
    }

    #[test]
    fn test_frame_rejects_wrong_key() {
        let frame = seal_frame(b"{}", KEY).unwrap();
        let other = b"ffffffffffffffffffffffffffffffff";
        assert!(matches!(open_frame(&frame, other), Err(AppError::Crypto(_))));
    }

    #[test]
    fn test_frame_rejects_truncated_header() {
        assert!(matches!(
            open_frame(b"FCBK0000", KEY),
            Err(AppError::Crypto(_))
        ));
        assert!(matches!(
            open_frame(b"XXXX", KEY),
            Err(AppError::Crypto(_))
        ));
    }

    #[test]
    fn test_short_key_rejected() {
        assert!(matches!(
            seal_frame(b"{}", b"short-key"),
            Err(AppError::Crypto(_))
        ));
    }

    #[test]
    fn test_nonces_are_fresh_per_seal() {
        let a = seal_frame(b"{}", KEY).unwrap();
        let b = seal_frame(b"{}", KEY).unwrap();
        assert_ne!(&a[4..4 + NONCE_LEN], &b[4..4 + NONCE_LEN]);
    }
}
