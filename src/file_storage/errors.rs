//! # File Storage Errors

use thiserror::Error;

use crate::errors::VaultError;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Raw blob storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    // Object errors
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Object already exists: {0}")]
    ObjectAlreadyExists(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    // Directory errors
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    // Validation errors
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    // I/O errors
    #[error("I/O error: {0}")]
    IoError(String),

    // Internal
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Attach operation context and lift into the vault taxonomy
    pub fn into_vault(self, op: &'static str, target: &str) -> VaultError {
        match self {
            StorageError::ObjectNotFound(key) => VaultError::NotFound(key),
            StorageError::ObjectAlreadyExists(key) => VaultError::AlreadyExists(key),
            StorageError::IsADirectory(key) => {
                VaultError::InvalidInput(format!("'{}' is a directory", key))
            }
            StorageError::NotADirectory(key) => {
                VaultError::InvalidInput(format!("'{}' is not a directory", key))
            }
            StorageError::DirectoryNotEmpty(key) => {
                VaultError::InvalidInput(format!("directory '{}' is not empty", key))
            }
            StorageError::InvalidPath(reason) => VaultError::PermissionDenied(reason),
            StorageError::IoError(reason) | StorageError::Internal(reason) => {
                VaultError::StorageUnavailable {
                    op,
                    target: target.to_string(),
                    reason,
                }
            }
        }
    }
}
