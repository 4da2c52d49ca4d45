//! # Vault Errors
//!
//! Crate-wide error taxonomy. Each subsystem keeps its own error enum
//! (`CodecError`, `MetadataError`, `StorageError`, `AuthError`,
//! `ConfigError`); they all fold into [`VaultError`] at the public surface.
//!
//! Storage-layer failures carry the operation and the target they failed on.

use thiserror::Error;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors surfaced by the vault core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Path resolution tried to leave the sandbox root
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Storage unavailable during {op} on '{target}': {reason}")]
    StorageUnavailable {
        op: &'static str,
        target: String,
        reason: String,
    },

    #[error("Storage timed out after {after_ms}ms during {op} on '{target}'")]
    StorageTimeout {
        op: &'static str,
        target: String,
        after_ms: u64,
    },

    /// Decode, decompress or consistency failure on persisted data
    #[error("Corrupted data in '{target}': {reason}")]
    Corrupted { target: String, reason: String },

    /// Another writer appended to the same history first
    #[error("Concurrent modification of '{filename}': expected version {expected}, found {found}")]
    ConcurrencyConflict {
        filename: String,
        expected: u64,
        found: u64,
    },

    /// Authenticated decryption or login failed
    #[error("Authentication failed")]
    AuthenticationFailure,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// Build a corruption error for a target
    pub fn corrupted(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "VAULT_NOT_FOUND",
            Self::AlreadyExists(_) => "VAULT_ALREADY_EXISTS",
            Self::PermissionDenied(_) => "VAULT_PERMISSION_DENIED",
            Self::StorageUnavailable { .. } => "VAULT_STORAGE_UNAVAILABLE",
            Self::StorageTimeout { .. } => "VAULT_STORAGE_TIMEOUT",
            Self::Corrupted { .. } => "VAULT_CORRUPTED",
            Self::ConcurrencyConflict { .. } => "VAULT_CONCURRENCY_CONFLICT",
            Self::AuthenticationFailure => "VAULT_AUTHENTICATION_FAILURE",
            Self::InvalidInput(_) => "VAULT_INVALID_INPUT",
            Self::Config(_) => "VAULT_CONFIG_ERROR",
        }
    }

    /// Whether an idempotent read may be retried after this error.
    ///
    /// Writes must re-check the latest state instead of retrying blindly.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageTimeout { .. } | Self::StorageUnavailable { .. }
        )
    }
}
