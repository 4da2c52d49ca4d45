//! # Storage Backend Trait
//!
//! Keys are `/`-separated relative paths such as `alice/docs/notes.txt`.
//! The empty key names the backend root.

use serde::{Deserialize, Serialize};

use super::errors::StorageResult;

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Backend trait for raw blob storage
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Write data to path, replacing any existing content
    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Read data from path
    fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Delete file at path
    fn delete(&self, path: &str) -> StorageResult<()>;

    /// Check if a file or directory exists at path
    fn exists(&self, path: &str) -> StorageResult<bool>;

    /// List the immediate children of a directory, sorted by name
    fn list(&self, dir: &str) -> StorageResult<Vec<DirEntry>>;

    /// Create a directory; the parent must exist
    fn create_dir(&self, path: &str) -> StorageResult<()>;

    /// Remove an empty directory
    fn remove_dir(&self, path: &str) -> StorageResult<()>;

    fn is_dir(&self, path: &str) -> StorageResult<bool>;
}

/// Split a key into validated components.
///
/// Keys are relative and fully normalised: no leading `/`, no empty, `.`
/// or `..` components.
pub(crate) fn key_components(key: &str) -> StorageResult<Vec<&str>> {
    use super::errors::StorageError;

    if key.is_empty() {
        return Ok(Vec::new());
    }

    key.split('/')
        .map(|component| match component {
            "" | "." | ".." => Err(StorageError::InvalidPath(format!(
                "key '{}' is not a normalised relative path",
                key
            ))),
            c if c.contains('\0') => Err(StorageError::InvalidPath(format!(
                "key '{}' contains a NUL byte",
                key
            ))),
            c => Ok(c),
        })
        .collect()
}

/// Parent key of a key, `""` for top-level keys
pub(crate) fn parent_key(key: &str) -> &str {
    key.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_storage::StorageError;

    #[test]
    fn test_key_components() {
        assert_eq!(key_components("").unwrap(), Vec::<&str>::new());
        assert_eq!(key_components("alice/docs/a.txt").unwrap(), vec!["alice", "docs", "a.txt"]);
    }

    #[test]
    fn test_unnormalised_keys_rejected() {
        for key in ["/alice", "alice/../bob", "alice//a", "./a", "alice/"] {
            assert!(
                matches!(key_components(key), Err(StorageError::InvalidPath(_))),
                "accepted {}",
                key
            );
        }
    }

    #[test]
    fn test_parent_key() {
        assert_eq!(parent_key("alice/docs/a.txt"), "alice/docs");
        assert_eq!(parent_key("alice"), "");
    }
}
