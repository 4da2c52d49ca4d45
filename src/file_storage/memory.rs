//! # In-Memory Backend
//!
//! Volatile blob storage with the same directory semantics as
//! `LocalBackend`. The empty key is the always-present root directory.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;

use super::backend::{key_components, parent_key, DirEntry, StorageBackend};
use super::errors::{StorageError, StorageResult};

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MemoryState {
    fn is_dir(&self, key: &str) -> bool {
        key.is_empty() || self.dirs.contains(key)
    }
}

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files
    pub fn file_count(&self) -> usize {
        self.state.read().files.len()
    }
}

impl StorageBackend for MemoryBackend {
    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let components = key_components(path)?;
        if components.is_empty() {
            return Err(StorageError::IsADirectory(path.to_string()));
        }

        let mut state = self.state.write();
        if state.is_dir(path) {
            return Err(StorageError::IsADirectory(path.to_string()));
        }

        // Create parent directories
        let mut ancestor = String::new();
        for component in &components[..components.len() - 1] {
            if !ancestor.is_empty() {
                ancestor.push('/');
            }
            ancestor.push_str(component);
            if state.files.contains_key(&ancestor) {
                return Err(StorageError::NotADirectory(ancestor));
            }
            state.dirs.insert(ancestor.clone());
        }

        state.files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        key_components(path)?;
        let state = self.state.read();
        if state.is_dir(path) {
            return Err(StorageError::IsADirectory(path.to_string()));
        }

        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound(path.to_string()))
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        key_components(path)?;
        let mut state = self.state.write();
        if state.is_dir(path) {
            return Err(StorageError::IsADirectory(path.to_string()));
        }

        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::ObjectNotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        key_components(path)?;
        let state = self.state.read();
        Ok(state.is_dir(path) || state.files.contains_key(path))
    }

    fn list(&self, dir: &str) -> StorageResult<Vec<DirEntry>> {
        key_components(dir)?;
        let state = self.state.read();
        if !state.is_dir(dir) {
            return Err(if state.files.contains_key(dir) {
                StorageError::NotADirectory(dir.to_string())
            } else {
                StorageError::ObjectNotFound(dir.to_string())
            });
        }

        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };
        let is_child = |key: &str| -> Option<String> {
            key.strip_prefix(prefix.as_str())
                .filter(|rest| !rest.is_empty() && !rest.contains('/'))
                .map(str::to_string)
        };

        let mut results: Vec<DirEntry> = state
            .dirs
            .iter()
            .filter_map(|key| is_child(key).map(DirEntry::directory))
            .chain(
                state
                    .files
                    .keys()
                    .filter_map(|key| is_child(key).map(DirEntry::file)),
            )
            .collect();

        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results)
    }

    fn create_dir(&self, path: &str) -> StorageResult<()> {
        key_components(path)?;
        let mut state = self.state.write();
        if state.is_dir(path) || state.files.contains_key(path) {
            return Err(StorageError::ObjectAlreadyExists(path.to_string()));
        }
        if !state.is_dir(parent_key(path)) {
            return Err(StorageError::ObjectNotFound(parent_key(path).to_string()));
        }

        state.dirs.insert(path.to_string());
        Ok(())
    }

    fn remove_dir(&self, path: &str) -> StorageResult<()> {
        key_components(path)?;
        let mut state = self.state.write();
        if state.files.contains_key(path) {
            return Err(StorageError::NotADirectory(path.to_string()));
        }
        if path.is_empty() {
            return Err(StorageError::InvalidPath("cannot remove the storage root".to_string()));
        }
        if !state.dirs.contains(path) {
            return Err(StorageError::ObjectNotFound(path.to_string()));
        }

        let prefix = format!("{}/", path);
        let occupied = state.dirs.iter().any(|k| k.starts_with(&prefix))
            || state.files.keys().any(|k| k.starts_with(&prefix));
        if occupied {
            return Err(StorageError::DirectoryNotEmpty(path.to_string()));
        }

        state.dirs.remove(path);
        Ok(())
    }

    fn is_dir(&self, path: &str) -> StorageResult<bool> {
        key_components(path)?;
        Ok(self.state.read().is_dir(path))
    }
}
