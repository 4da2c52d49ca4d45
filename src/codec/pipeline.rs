//! # Codec Pipeline
//!
//! Ordered composition of content transforms. `encode` applies the stages
//! front to back, `decode` undoes them back to front.

use super::compression::{compress, decompress};
use super::encryption::{decrypt, encrypt, EncryptionKey};
use super::errors::CodecResult;

/// A single transform stage
#[derive(Debug, Clone)]
pub enum Stage {
    Compress,
    Encrypt(EncryptionKey),
}

/// Ordered list of stages
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Create an empty (identity) pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a compression stage
    pub fn compress(mut self) -> Self {
        self.stages.push(Stage::Compress);
        self
    }

    /// Append an encryption stage
    pub fn encrypt(mut self, key: EncryptionKey) -> Self {
        self.stages.push(Stage::Encrypt(key));
        self
    }

    /// The configured stages, in encode order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Apply every stage in order
    pub fn encode(&self, data: &[u8]) -> CodecResult<Vec<u8>> {
        let mut buf = data.to_vec();
        for stage in &self.stages {
            buf = match stage {
                Stage::Compress => compress(&buf)?,
                Stage::Encrypt(key) => encrypt(&buf, key)?,
            };
        }
        Ok(buf)
    }

    /// Undo every stage in reverse order
    pub fn decode(&self, encoded: &[u8]) -> CodecResult<Vec<u8>> {
        let mut buf = encoded.to_vec();
        for stage in self.stages.iter().rev() {
            buf = match stage {
                Stage::Compress => decompress(&buf)?,
                Stage::Encrypt(key) => decrypt(&buf, key)?,
            };
        }
        Ok(buf)
    }
}
