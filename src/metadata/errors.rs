//! # Metadata Store Errors

use thiserror::Error;

use crate::errors::VaultError;

/// Result type for metadata store operations
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Document store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Document already exists: {collection}/{id}")]
    DuplicateDocument { collection: String, id: String },

    /// Conditional append lost a race
    #[error("Append conflict on '{filename}': expected latest {expected}, found {found}")]
    Conflict {
        filename: String,
        expected: u64,
        found: u64,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Operation {op} timed out after {after_ms}ms")]
    Timeout { op: &'static str, after_ms: u64 },

    /// A persisted document failed to decode or verify
    #[error("Corrupted document {target}: {reason}")]
    Corrupted { target: String, reason: String },
}

impl MetadataError {
    /// Attach operation context and lift into the vault taxonomy
    pub fn into_vault(self, op: &'static str, target: &str) -> VaultError {
        match self {
            MetadataError::NotFound { collection, id } => {
                VaultError::NotFound(format!("{}/{}", collection, id))
            }
            MetadataError::DuplicateDocument { collection, id } => {
                VaultError::AlreadyExists(format!("{}/{}", collection, id))
            }
            MetadataError::Conflict {
                filename,
                expected,
                found,
            } => VaultError::ConcurrencyConflict {
                filename,
                expected,
                found,
            },
            MetadataError::Unavailable(reason) => VaultError::StorageUnavailable {
                op,
                target: target.to_string(),
                reason,
            },
            MetadataError::Timeout { after_ms, .. } => VaultError::StorageTimeout {
                op,
                target: target.to_string(),
                after_ms,
            },
            MetadataError::Corrupted { target, reason } => VaultError::Corrupted { target, reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_vault_adds_context() {
        let err = MetadataError::Timeout {
            op: "find_document",
            after_ms: 10_000,
        }
        .into_vault("latest_version", "alice/notes.txt");

        assert_eq!(
            err,
            VaultError::StorageTimeout {
                op: "latest_version",
                target: "alice/notes.txt".to_string(),
                after_ms: 10_000,
            }
        );
    }

    #[test]
    fn test_conflict_maps_to_concurrency_conflict() {
        let err = MetadataError::Conflict {
            filename: "f".into(),
            expected: 1,
            found: 2,
        }
        .into_vault("add_version", "f");
        assert_eq!(err.code(), "VAULT_CONCURRENCY_CONFLICT");
    }
}
