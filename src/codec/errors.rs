//! # Codec Errors

use thiserror::Error;

use crate::errors::VaultError;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Content transform errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Compressed input could not be decoded
    #[error("Corrupted input: {0}")]
    Corrupted(String),

    /// Tag did not verify: wrong key, truncation or tampering
    #[error("Authentication failure")]
    AuthenticationFailure,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Encryption failed")]
    EncryptionFailed,
}

impl From<CodecError> for VaultError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Corrupted(reason) => VaultError::corrupted("content", reason),
            CodecError::AuthenticationFailure => VaultError::AuthenticationFailure,
            CodecError::InvalidKey(reason) => VaultError::Config(reason),
            CodecError::CompressionFailed(reason) => {
                VaultError::InvalidInput(format!("compression failed: {}", reason))
            }
            CodecError::EncryptionFailed => {
                VaultError::InvalidInput("encryption failed".to_string())
            }
        }
    }
}
