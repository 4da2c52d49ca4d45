//! # Content Codec
//!
//! Stateless transforms over byte buffers:
//!
//! - gzip compression ([`compress`] / [`decompress`])
//! - XChaCha20-Poly1305 authenticated encryption ([`encrypt`] / [`decrypt`])
//! - base64 armouring for text transports
//!
//! Transforms are independent stages. Versioning never applies them
//! implicitly; callers compose them, optionally through a [`Pipeline`].

pub mod compression;
pub mod encryption;
pub mod errors;
pub mod pipeline;

pub use compression::{compress, decompress};
pub use encryption::{decrypt, encrypt, EncryptionKey, KEY_LEN, NONCE_LEN, TAG_LEN};
pub use errors::{CodecError, CodecResult};
pub use pipeline::{Pipeline, Stage};

use base64::Engine;

/// Encode bytes as standard base64
pub fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode standard base64 text
pub fn decode_base64(text: &str) -> CodecResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| CodecError::Corrupted(format!("invalid base64: {}", e)))
}
