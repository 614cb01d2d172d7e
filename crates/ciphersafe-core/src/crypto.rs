//! Cipher envelope for secret values.
//!
//! Every secret value is sealed with AES-256-GCM under the process-wide
//! master key before it reaches storage, and opened again on the way out.
//!
//! # Envelope format
//!
//! ```text
//! version (1 byte) || nonce (12 bytes) || ciphertext || tag (16 bytes)
//! ```
//!
//! stored as lowercase hex. Version `0x01` is the only one issued; the byte
//! is reserved for key rotation. The version byte is prepended to the
//! caller's associated data, so it is authenticated along with the body.
//!
//! # Security model
//!
//! - Every seal generates a fresh 96-bit nonce via `OsRng`.
//! - Opening never returns partial plaintext: any failure is
//!   [`CryptoError::AuthenticationFailure`].
//! - Key types derive `Zeroize` + `ZeroizeOnDrop` and redact `Debug`.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Envelope format version currently issued.
pub const ENVELOPE_VERSION: u8 = 0x01;

/// Key length for AES-256-GCM (256 bits).
pub const KEY_LEN: usize = 32;

/// Nonce length for AES-256-GCM (96 bits).
pub const NONCE_LEN: usize = 12;

/// Authentication tag length (128 bits).
pub const TAG_LEN: usize = 16;

/// Smallest possible envelope: version + nonce + tag over an empty plaintext.
const MIN_ENVELOPE_LEN: usize = 1 + NONCE_LEN + TAG_LEN;

/// A 256-bit master key that is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create a key from a slice that must be exactly 32 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] for any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }

    /// Decode a key from 64 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyEncoding`] if the input is not hex,
    /// or [`CryptoError::InvalidKeyLength`] if it does not decode to 32 bytes.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let mut decoded = hex::decode(encoded.trim()).map_err(|e| {
            CryptoError::InvalidKeyEncoding {
                reason: e.to_string(),
            }
        })?;
        let key = Self::from_slice(&decoded);
        decoded.zeroize();
        key
    }

    /// Generate a new random key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    ///
    /// The caller must not log or persist these bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

fn versioned_aad(aad: &[u8]) -> Vec<u8> {
    let mut full = Vec::with_capacity(aad.len().saturating_add(1));
    full.push(ENVELOPE_VERSION);
    full.extend_from_slice(aad);
    full
}

/// Seal plaintext into a binary envelope with a fresh random nonce.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
pub fn seal(key: &EncryptionKey, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let aad = versioned_aad(aad);
    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|e| CryptoError::Encryption {
            reason: e.to_string(),
        })?;

    // version || nonce || ciphertext (tag appended by aes-gcm)
    let mut envelope = Vec::with_capacity(
        1usize
            .saturating_add(NONCE_LEN)
            .saturating_add(ciphertext.len()),
    );
    envelope.push(ENVELOPE_VERSION);
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Open a binary envelope produced by [`seal`].
///
/// # Errors
///
/// Returns [`CryptoError::AuthenticationFailure`] if the envelope is too
/// short, carries an unknown version, or fails tag verification.
pub fn open(key: &EncryptionKey, envelope: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if envelope.len() < MIN_ENVELOPE_LEN {
        return Err(CryptoError::AuthenticationFailure {
            reason: format!(
                "envelope too short: expected at least {MIN_ENVELOPE_LEN} bytes, got {}",
                envelope.len()
            ),
        });
    }

    let (version, rest) = envelope.split_at(1);
    if version != [ENVELOPE_VERSION] {
        return Err(CryptoError::AuthenticationFailure {
            reason: format!("unknown envelope version {:#04x}", version[0]),
        });
    }

    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let aad = versioned_aad(aad);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| CryptoError::AuthenticationFailure {
            reason: "tag mismatch".to_owned(),
        })
}

/// Seals and opens hex-encoded envelopes under one master key.
///
/// Constructed once at startup from configuration and shared read-only.
#[derive(Debug, Clone)]
pub struct EnvelopeCipher {
    key: EncryptionKey,
}

impl EnvelopeCipher {
    #[must_use]
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// Seal `plaintext`, binding `aad`, and hex-encode the envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<String, CryptoError> {
        seal(&self.key, plaintext, aad).map(hex::encode)
    }

    /// Decode and open a hex envelope, checking it against `aad`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::AuthenticationFailure`] if the hex is invalid
    /// or the envelope does not open.
    pub fn open(&self, envelope: &str, aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let bytes = hex::decode(envelope).map_err(|e| CryptoError::AuthenticationFailure {
            reason: format!("invalid envelope encoding: {e}"),
        })?;
        open(&self.key, &bytes, aad)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = EncryptionKey::generate();
        let envelope = seal(&key, b"my-secret-password", b"ctx").unwrap();
        let opened = open(&key, &envelope, b"ctx").unwrap();
        assert_eq!(opened, b"my-secret-password");
    }

    #[test]
    fn seal_open_empty_plaintext() {
        let key = EncryptionKey::generate();
        let envelope = seal(&key, b"", b"").unwrap();
        assert_eq!(envelope.len(), MIN_ENVELOPE_LEN);
        assert!(open(&key, &envelope, b"").unwrap().is_empty());
    }

    #[test]
    fn envelope_layout_is_version_nonce_ciphertext_tag() {
        let key = EncryptionKey::generate();
        let envelope = seal(&key, b"data", b"").unwrap();
        assert_eq!(envelope[0], ENVELOPE_VERSION);
        assert_eq!(envelope.len(), 1 + NONCE_LEN + 4 + TAG_LEN);
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        let key = EncryptionKey::generate();
        let envelope = seal(&key, b"s3cr3t", b"ctx").unwrap();

        for byte in 0..envelope.len() {
            for bit in 0..8 {
                let mut tampered = envelope.clone();
                tampered[byte] ^= 1 << bit;
                let result = open(&key, &tampered, b"ctx");
                assert!(
                    matches!(result, Err(CryptoError::AuthenticationFailure { .. })),
                    "flip of bit {bit} in byte {byte} was not detected"
                );
            }
        }
    }

    #[test]
    fn wrong_key_fails() {
        let k1 = EncryptionKey::generate();
        let k2 = EncryptionKey::generate();
        let envelope = seal(&k1, b"secret", b"").unwrap();
        assert!(matches!(
            open(&k2, &envelope, b""),
            Err(CryptoError::AuthenticationFailure { .. })
        ));
    }

    #[test]
    fn wrong_associated_data_fails() {
        let key = EncryptionKey::generate();
        let envelope = seal(&key, b"secret", b"project:1").unwrap();
        assert!(open(&key, &envelope, b"project:2").is_err());
    }

    #[test]
    fn same_plaintext_seals_differently() {
        let key = EncryptionKey::generate();
        let e1 = seal(&key, b"same data", b"").unwrap();
        let e2 = seal(&key, b"same data", b"").unwrap();
        assert_ne!(e1, e2);
    }

    #[test]
    fn too_short_fails() {
        let key = EncryptionKey::generate();
        for len in [0, 1, NONCE_LEN, MIN_ENVELOPE_LEN - 1] {
            let result = open(&key, &vec![ENVELOPE_VERSION; len], b"");
            assert!(matches!(
                result,
                Err(CryptoError::AuthenticationFailure { .. })
            ));
        }
    }

    #[test]
    fn truncated_envelope_fails() {
        let key = EncryptionKey::generate();
        let envelope = seal(&key, b"some longer secret value", b"").unwrap();
        let truncated = &envelope[..envelope.len() - 1];
        assert!(open(&key, truncated, b"").is_err());
    }

    #[test]
    fn cipher_hex_roundtrip() {
        let cipher = EnvelopeCipher::new(EncryptionKey::generate());
        let sealed = cipher.seal(b"s3cr3t", b"aad").unwrap();
        assert!(sealed.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!sealed.contains("s3cr3t"));
        assert_eq!(cipher.open(&sealed, b"aad").unwrap(), b"s3cr3t");
    }

    #[test]
    fn cipher_rejects_non_hex() {
        let cipher = EnvelopeCipher::new(EncryptionKey::generate());
        assert!(matches!(
            cipher.open("invalid-ciphertext", b""),
            Err(CryptoError::AuthenticationFailure { .. })
        ));
    }

    #[test]
    fn key_from_hex_requires_32_bytes() {
        let hex_key = "00".repeat(KEY_LEN);
        assert!(EncryptionKey::from_hex(&hex_key).is_ok());
        assert!(matches!(
            EncryptionKey::from_hex(&"00".repeat(16)),
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            })
        ));
        assert!(matches!(
            EncryptionKey::from_hex("zz"),
            Err(CryptoError::InvalidKeyEncoding { .. })
        ));
    }

    #[test]
    fn key_from_slice_checks_length() {
        assert!(EncryptionKey::from_slice(b"12345678901234567890123456789012").is_ok());
        assert!(EncryptionKey::from_slice(b"short").is_err());
    }

    #[test]
    fn encryption_key_debug_redacts_bytes() {
        let key = EncryptionKey::from_bytes([0xAB; KEY_LEN]);
        let debug = format!("{key:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("171"));
    }
}
