//! # Local Filesystem Backend
//!
//! Stores blobs as plain files under a root directory. Keys are validated
//! before they touch the filesystem, and symlinks that lead outside the
//! root are refused.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::backend::{key_components, parent_key, DirEntry, StorageBackend};
use super::errors::{StorageError, StorageResult};

/// Local filesystem storage backend
#[derive(Debug)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Open a backend rooted at `root`, creating the directory if needed
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| StorageError::IoError(e.to_string()))?;
        let root = root
            .canonicalize()
            .map_err(|e| StorageError::IoError(e.to_string()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, key: &str) -> StorageResult<PathBuf> {
        let mut path = self.root.clone();
        for component in key_components(key)? {
            path.push(component);
        }
        self.check_contained(key, &path)?;
        Ok(path)
    }

    /// The deepest existing ancestor must resolve inside the root
    fn check_contained(&self, key: &str, path: &Path) -> StorageResult<()> {
        for ancestor in path.ancestors() {
            if let Ok(real) = ancestor.canonicalize() {
                if real.starts_with(&self.root) {
                    return Ok(());
                }
                return Err(StorageError::InvalidPath(format!(
                    "key '{}' resolves outside the storage root",
                    key
                )));
            }
        }
        Ok(())
    }
}

fn map_io(key: &str, e: io::Error) -> StorageError {
    if e.kind() == io::ErrorKind::NotFound {
        StorageError::ObjectNotFound(key.to_string())
    } else {
        StorageError::IoError(e.to_string())
    }
}

impl StorageBackend for LocalBackend {
    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        if full_path.is_dir() {
            return Err(StorageError::IsADirectory(path.to_string()));
        }

        // Create parent directories
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::IoError(e.to_string()))?;
        }

        fs::write(&full_path, data).map_err(|e| StorageError::IoError(e.to_string()))
    }

    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.full_path(path)?;
        if full_path.is_dir() {
            return Err(StorageError::IsADirectory(path.to_string()));
        }

        fs::read(&full_path).map_err(|e| map_io(path, e))
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        if full_path.is_dir() {
            return Err(StorageError::IsADirectory(path.to_string()));
        }

        fs::remove_file(&full_path).map_err(|e| map_io(path, e))
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.full_path(path)?.exists())
    }

    fn list(&self, dir: &str) -> StorageResult<Vec<DirEntry>> {
        let full_path = self.full_path(dir)?;
        if !full_path.is_dir() {
            return Err(if full_path.exists() {
                StorageError::NotADirectory(dir.to_string())
            } else {
                StorageError::ObjectNotFound(dir.to_string())
            });
        }

        let mut results = Vec::new();
        for entry in fs::read_dir(&full_path).map_err(|e| map_io(dir, e))? {
            let entry = entry.map_err(|e| StorageError::IoError(e.to_string()))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let file_type = entry
                .file_type()
                .map_err(|e| StorageError::IoError(e.to_string()))?;
            results.push(if file_type.is_dir() {
                DirEntry::directory(name)
            } else {
                DirEntry::file(name)
            });
        }

        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results)
    }

    fn create_dir(&self, path: &str) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        if full_path.exists() {
            return Err(StorageError::ObjectAlreadyExists(path.to_string()));
        }
        if !self.is_dir(parent_key(path))? {
            return Err(StorageError::ObjectNotFound(parent_key(path).to_string()));
        }

        fs::create_dir(&full_path).map_err(|e| map_io(path, e))
    }

    fn remove_dir(&self, path: &str) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        if !full_path.exists() {
            return Err(StorageError::ObjectNotFound(path.to_string()));
        }
        if !full_path.is_dir() {
            return Err(StorageError::NotADirectory(path.to_string()));
        }

        let mut children = fs::read_dir(&full_path).map_err(|e| map_io(path, e))?;
        if children.next().is_some() {
            return Err(StorageError::DirectoryNotEmpty(path.to_string()));
        }

        fs::remove_dir(&full_path).map_err(|e| map_io(path, e))
    }

    fn is_dir(&self, path: &str) -> StorageResult<bool> {
        Ok(self.full_path(path)?.is_dir())
    }
}
