//! # Encryption
//!
//! XChaCha20-Poly1305 authenticated encryption.
//!
//! Blob layout: `nonce (24) || ciphertext || tag (16)`.
//!
//! ## Invariants
//! - A fresh random nonce is drawn for every call to [`encrypt`]
//! - [`decrypt`] never returns plaintext whose tag did not verify
//! - Key material is never printed; `Debug` is redacted

use std::fmt;

use base64::Engine;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;

use super::errors::{CodecError, CodecResult};

/// Key length in bytes
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes
pub const NONCE_LEN: usize = 24;

/// Authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// A 256-bit symmetric key injected from configuration
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Build a key from raw bytes; exactly 32 bytes are required
    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CodecError::InvalidKey(format!(
                "expected {} key bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Parse a key from 64 hex characters or standard base64
    pub fn from_encoded(text: &str) -> CodecResult<Self> {
        let text = text.trim();
        if text.len() == KEY_LEN * 2 && text.chars().all(|c| c.is_ascii_hexdigit()) {
            let bytes = hex::decode(text)
                .map_err(|e| CodecError::InvalidKey(format!("invalid hex key: {}", e)))?;
            return Self::from_bytes(&bytes);
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(|_| CodecError::InvalidKey("key is neither hex nor base64".to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Read a key from the named environment variable
    pub fn from_env(var: &str) -> CodecResult<Self> {
        let value = std::env::var(var)
            .map_err(|_| CodecError::InvalidKey(format!("environment variable {} is not set", var)))?;
        Self::from_encoded(&value)
    }

    /// Generate a random key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.0))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// Encrypt `data`, returning `nonce || ciphertext || tag`
pub fn encrypt(data: &[u8], key: &EncryptionKey) -> CodecResult<Vec<u8>> {
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let sealed = key
        .cipher()
        .encrypt(&nonce, data)
        .map_err(|_| CodecError::EncryptionFailed)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
    blob.extend_from_slice(nonce.as_slice());
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt`]
pub fn decrypt(blob: &[u8], key: &EncryptionKey) -> CodecResult<Vec<u8>> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(CodecError::AuthenticationFailure);
    }

    let (nonce, sealed) = blob.split_at(NONCE_LEN);
    key.cipher()
        .decrypt(XNonce::from_slice(nonce), sealed)
        .map_err(|_| CodecError::AuthenticationFailure)
}
