//! # File Record
//!
//! Metadata about a file's current content, stored in the `files`
//! collection keyed by storage key. Rewritten on every create/update and
//! removed on delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::{VaultError, VaultResult};
use crate::metadata::FILE_COLLECTION;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    pub size_bytes: u64,
    /// SHA-256 of the current content, hex encoded
    pub checksum: String,
    pub latest_version: u64,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(filename: impl Into<String>, content: &[u8], latest_version: u64) -> Self {
        Self {
            filename: filename.into(),
            size_bytes: content.len() as u64,
            checksum: content_checksum(content),
            latest_version,
            updated_at: Utc::now(),
        }
    }

    /// Whether `content` matches the recorded checksum
    pub fn matches(&self, content: &[u8]) -> bool {
        self.size_bytes == content.len() as u64 && self.checksum == content_checksum(content)
    }

    pub fn to_document(&self) -> VaultResult<Value> {
        serde_json::to_value(self)
            .map_err(|e| VaultError::corrupted(format!("{}/{}", FILE_COLLECTION, self.filename), e.to_string()))
    }

    pub fn from_document(filename: &str, document: Value) -> VaultResult<Self> {
        serde_json::from_value(document)
            .map_err(|e| VaultError::corrupted(format!("{}/{}", FILE_COLLECTION, filename), e.to_string()))
    }
}

/// SHA-256 of `content`, hex encoded
pub fn content_checksum(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_describes_content() {
        let record = FileRecord::new("alice/notes.txt", b"hello", 1);

        assert_eq!(record.size_bytes, 5);
        assert_eq!(
            record.checksum,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(record.matches(b"hello"));
        assert!(!record.matches(b"hellp"));
    }

    #[test]
    fn test_document_shape() {
        let record = FileRecord::new("alice/notes.txt", b"", 3);
        let document = record.to_document().unwrap();

        assert_eq!(document["latest_version"], 3);
        assert_eq!(FileRecord::from_document("alice/notes.txt", document).unwrap(), record);
    }

    #[test]
    fn test_malformed_document_is_corrupted() {
        let result = FileRecord::from_document("alice/x", serde_json::json!({"size_bytes": "big"}));
        assert!(matches!(result, Err(VaultError::Corrupted { .. })));
    }
}
