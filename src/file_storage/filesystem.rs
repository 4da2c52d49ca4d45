//! # FileSystem
//!
//! Orchestrates raw blob storage, sandbox containment, the read cache, file
//! records and the version store.
//!
//! ## Invariants
//!
//! - Create and update hold the file's append lock across the raw write and
//!   the version append, so content order and version order agree
//! - If the append fails after the raw write, the previous content is
//!   restored (or the new blob removed) before the error is returned
//! - If the append timed out and may still land, the new content is kept
//!   and the write fails with `Corrupted`, so content never trails a
//!   recorded version
//! - A failed delete puts the content and its record back
//! - `file_record` only returns a record that agrees with the current
//!   content and the latest version
//! - After a successful write the cache holds the new content; after any
//!   failure or delete the cache entry is gone
//! - Read misses repopulate the cache under the same lock, so a reader
//!   cannot reinstate content a concurrent writer has replaced

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::backend::{DirEntry, StorageBackend};
use super::errors::StorageError;
use super::record::FileRecord;
use crate::cache::ReadCache;
use crate::errors::{VaultError, VaultResult};
use crate::metadata::FILE_COLLECTION;
use crate::retry::{retry_read, RetryPolicy};
use crate::sandbox::{SandboxPath, SandboxRoot};
use crate::session::Session;
use crate::versioning::{FileLock, Version, VersionStore, APPEND_OP};

/// What `create_file` does when the file already has content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatePolicy {
    /// Overwrite and append a new version
    #[default]
    Overwrite,
    /// Fail with `AlreadyExists`
    Reject,
}

/// What happens to a file's history when it is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Keep the history; a re-created file continues its numbering
    #[default]
    Retain,
    /// Drop the history with the content
    Purge,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileSystemOptions {
    pub create_policy: CreatePolicy,
    pub delete_policy: DeletePolicy,
}

/// Versioned, sandboxed file operations
#[derive(Debug)]
pub struct FileSystem {
    backend: Arc<dyn StorageBackend>,
    versions: Arc<VersionStore>,
    cache: Arc<ReadCache>,
    options: FileSystemOptions,
}

impl FileSystem {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        versions: Arc<VersionStore>,
        cache: Arc<ReadCache>,
    ) -> Self {
        Self {
            backend,
            versions,
            cache,
            options: FileSystemOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FileSystemOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> FileSystemOptions {
        self.options
    }

    pub fn cache(&self) -> &Arc<ReadCache> {
        &self.cache
    }

    pub fn versions_store(&self) -> &Arc<VersionStore> {
        &self.versions
    }

    /// Resolve a request against the session's root and current directory
    pub fn resolve_path(&self, session: &Session, requested: &str) -> VaultResult<SandboxPath> {
        session.root().resolve(session.cwd(), requested)
    }

    /// Create the storage directory for a sandbox root if it is missing
    pub fn provision_root(&self, root: &SandboxRoot) -> VaultResult<()> {
        match self.backend.create_dir(root.name()) {
            Ok(()) => {
                info!(root = root.name(), "created sandbox root");
                Ok(())
            }
            Err(StorageError::ObjectAlreadyExists(_)) => {
                if self.is_dir(root.name())? {
                    Ok(())
                } else {
                    Err(VaultError::InvalidInput(format!(
                        "sandbox root '{}' is occupied by a file",
                        root.name()
                    )))
                }
            }
            Err(e) => Err(e.into_vault("provision_root", root.name())),
        }
    }

    // ==================
    // File operations
    // ==================

    /// Write `content` and record it as a new version
    pub fn create_file(&self, session: &Session, name: &str, content: &[u8]) -> VaultResult<u64> {
        let key = self.file_key(session, name)?;
        self.ensure_parent_dir(&key)?;

        let lock = self.versions.lock(&key);
        let previous = self.current_content(&key, "create_file")?;

        if previous.is_some() && self.options.create_policy == CreatePolicy::Reject {
            return Err(VaultError::AlreadyExists(key));
        }

        self.write_versioned(&lock, previous, content)
    }

    /// Read the current content, from cache when possible
    pub fn read_file(&self, session: &Session, name: &str) -> VaultResult<Vec<u8>> {
        let key = self.file_key(session, name)?;

        if let Some(content) = self.cache.get(&key) {
            debug!(key = %key, "cache hit");
            return Ok(content);
        }

        let _lock = self.versions.lock(&key);
        let content = self
            .backend
            .read(&key)
            .map_err(|e| e.into_vault("read_file", &key))?;

        debug!(key = %key, size_bytes = content.len(), "cache miss, loaded from storage");
        self.cache.set(key, content.clone());
        Ok(content)
    }

    /// `read_file`, retried with backoff while storage is unavailable or slow
    pub fn read_file_retrying(
        &self,
        session: &Session,
        name: &str,
        policy: &RetryPolicy,
    ) -> VaultResult<Vec<u8>> {
        retry_read(policy, "read_file", || self.read_file(session, name))
    }

    /// Replace existing content and record a new version
    pub fn update_file(&self, session: &Session, name: &str, content: &[u8]) -> VaultResult<u64> {
        let key = self.file_key(session, name)?;

        let lock = self.versions.lock(&key);
        let previous = self
            .current_content(&key, "update_file")?
            .ok_or_else(|| VaultError::NotFound(key.clone()))?;

        self.write_versioned(&lock, Some(previous), content)
    }

    /// Remove current content and its record; history follows the delete policy
    pub fn delete_file(&self, session: &Session, name: &str) -> VaultResult<()> {
        let key = self.file_key(session, name)?;

        let lock = self.versions.lock(&key);
        let previous = self
            .current_content(&key, "delete_file")?
            .ok_or_else(|| VaultError::NotFound(key.clone()))?;
        let record = self
            .versions
            .metadata()
            .find_document(FILE_COLLECTION, &key)
            .map_err(|e| e.into_vault("delete_file", &key))?;

        self.backend
            .delete(&key)
            .map_err(|e| e.into_vault("delete_file", &key))?;
        self.cache.delete(&key);

        if let Err(e) = self
            .versions
            .metadata()
            .delete_document(FILE_COLLECTION, &key)
        {
            let cause = e.into_vault("delete_record", &key);
            return Err(self.undo_delete(&key, &previous, record, cause));
        }

        if self.options.delete_policy == DeletePolicy::Purge {
            if let Err(cause) = self.versions.purge_locked(&lock) {
                return Err(self.undo_delete(&key, &previous, record, cause));
            }
        }

        info!(key = %key, policy = ?self.options.delete_policy, "deleted file");
        Ok(())
    }

    /// All recorded versions of a file, ascending
    pub fn versions(&self, session: &Session, name: &str) -> VaultResult<Vec<Version>> {
        let key = self.file_key(session, name)?;
        self.versions.all_versions(&key)
    }

    /// Latest version number of a file, 0 if it has none
    pub fn latest_version(&self, session: &Session, name: &str) -> VaultResult<u64> {
        let key = self.file_key(session, name)?;
        self.versions.latest_version(&key)
    }

    /// Metadata about a file's current content.
    ///
    /// Fails with `Corrupted` when the stored record is missing or disagrees
    /// with the content or the latest version.
    pub fn file_record(&self, session: &Session, name: &str) -> VaultResult<FileRecord> {
        let key = self.file_key(session, name)?;

        let _lock = self.versions.lock(&key);
        let content = self
            .current_content(&key, "file_record")?
            .ok_or_else(|| VaultError::NotFound(key.clone()))?;
        let document = self
            .versions
            .metadata()
            .find_document(FILE_COLLECTION, &key)
            .map_err(|e| e.into_vault("file_record", &key))?
            .ok_or_else(|| VaultError::corrupted(key.as_str(), "file has content but no record"))?;
        let record = FileRecord::from_document(&key, document)?;

        let latest = self.versions.latest_version(&key)?;
        if record.latest_version != latest || !record.matches(&content) {
            return Err(VaultError::corrupted(
                key.as_str(),
                format!(
                    "stale file record: records version {}, latest is {}",
                    record.latest_version, latest
                ),
            ));
        }

        Ok(record)
    }

    // ==================
    // Directory operations
    // ==================

    pub fn create_dir(&self, session: &Session, dir: &str) -> VaultResult<()> {
        let path = self.resolve_path(session, dir)?;
        if path.is_root() {
            return Err(VaultError::AlreadyExists(session.root().storage_key(&path)));
        }

        let key = session.root().storage_key(&path);
        self.ensure_parent_dir(&key)?;
        self.backend
            .create_dir(&key)
            .map_err(|e| e.into_vault("create_dir", &key))?;

        info!(key = %key, "created directory");
        Ok(())
    }

    /// Remove an empty directory
    pub fn remove_dir(&self, session: &Session, dir: &str) -> VaultResult<()> {
        let path = self.resolve_path(session, dir)?;
        if path.is_root() {
            return Err(VaultError::PermissionDenied(
                "cannot remove the sandbox root".to_string(),
            ));
        }
        if session.cwd().starts_with(&path) {
            return Err(VaultError::InvalidInput(format!(
                "'{}' contains the current directory",
                path
            )));
        }

        let key = session.root().storage_key(&path);
        self.backend
            .remove_dir(&key)
            .map_err(|e| e.into_vault("remove_dir", &key))?;

        info!(key = %key, "removed directory");
        Ok(())
    }

    /// Entries of the current directory
    pub fn list(&self, session: &Session) -> VaultResult<Vec<DirEntry>> {
        self.list_dir(session, ".")
    }

    pub fn list_dir(&self, session: &Session, dir: &str) -> VaultResult<Vec<DirEntry>> {
        let path = self.resolve_path(session, dir)?;
        let key = session.root().storage_key(&path);
        self.backend
            .list(&key)
            .map_err(|e| e.into_vault("list", &key))
    }

    /// Move the session to an existing directory.
    ///
    /// On any failure the session is left where it was.
    pub fn change_dir(&self, session: &mut Session, dir: &str) -> VaultResult<()> {
        let path = self.resolve_path(session, dir)?;
        let key = session.root().storage_key(&path);

        if !self.is_dir(&key)? {
            return Err(VaultError::NotFound(format!("directory '{}'", path)));
        }

        debug!(session = %session.id(), from = %session.cwd(), to = %path, "changed directory");
        session.set_cwd(path);
        Ok(())
    }

    // ==================
    // Internals
    // ==================

    fn file_key(&self, session: &Session, name: &str) -> VaultResult<String> {
        let path = self.resolve_path(session, name)?;
        if path.is_root() {
            return Err(VaultError::InvalidInput(format!(
                "'{}' does not name a file",
                name
            )));
        }
        Ok(session.root().storage_key(&path))
    }

    fn is_dir(&self, key: &str) -> VaultResult<bool> {
        self.backend
            .is_dir(key)
            .map_err(|e| e.into_vault("is_dir", key))
    }

    fn ensure_parent_dir(&self, key: &str) -> VaultResult<()> {
        let parent = super::backend::parent_key(key);
        if !self.is_dir(parent)? {
            return Err(VaultError::NotFound(format!("directory '{}'", parent)));
        }
        Ok(())
    }

    fn current_content(&self, key: &str, op: &'static str) -> VaultResult<Option<Vec<u8>>> {
        match self.backend.read(key) {
            Ok(content) => Ok(Some(content)),
            Err(StorageError::ObjectNotFound(_)) => Ok(None),
            Err(e) => Err(e.into_vault(op, key)),
        }
    }

    /// Raw write then version append, compensating if the append fails.
    ///
    /// Caller holds `lock` for the file.
    fn write_versioned(
        &self,
        lock: &FileLock<'_>,
        previous: Option<Vec<u8>>,
        content: &[u8],
    ) -> VaultResult<u64> {
        let key = lock.filename();

        if let Err(e) = self.backend.write(key, content) {
            self.cache.delete(key);
            return Err(e.into_vault("write", key));
        }

        let number = match self.versions.add_version_locked(lock, content) {
            Ok(number) => number,
            Err(append_err @ VaultError::StorageTimeout { op: APPEND_OP, .. }) => {
                // The append may still land, so the new content stays
                self.cache.delete(key);
                error!(key = %key, error = %append_err, "version append outcome unknown, keeping new content");
                return Err(VaultError::corrupted(
                    key,
                    format!("version append outcome unknown ({}); new content kept", append_err),
                ));
            }
            Err(append_err) => {
                self.cache.delete(key);
                return Err(self.compensate(key, previous, append_err));
            }
        };

        self.cache.set(key, content.to_vec());
        self.save_record(key, content, number);

        info!(key = %key, version = number, size_bytes = content.len(), "wrote file");
        Ok(number)
    }

    fn compensate(&self, key: &str, previous: Option<Vec<u8>>, append_err: VaultError) -> VaultError {
        let restored = match previous {
            Some(old) => self.backend.write(key, &old),
            None => self.backend.delete(key),
        };

        match restored {
            Ok(()) => {
                warn!(key = %key, error = %append_err, "version append failed, content rolled back");
                append_err
            }
            Err(rollback_err) => {
                error!(
                    key = %key,
                    append_error = %append_err,
                    rollback_error = %rollback_err,
                    "version append failed and content could not be rolled back"
                );
                VaultError::corrupted(
                    key,
                    format!(
                        "version append failed ({}); restoring previous content failed ({})",
                        append_err, rollback_err
                    ),
                )
            }
        }
    }

    /// Put back content (and its record) removed by a failed delete
    fn undo_delete(
        &self,
        key: &str,
        content: &[u8],
        record: Option<Value>,
        cause: VaultError,
    ) -> VaultError {
        let restored = self
            .backend
            .write(key, content)
            .map_err(|e| e.into_vault("restore", key))
            .and_then(|()| match record {
                Some(document) => self
                    .versions
                    .metadata()
                    .upsert_document(FILE_COLLECTION, key, document)
                    .map_err(|e| e.into_vault("restore_record", key)),
                None => Ok(()),
            });

        match restored {
            Ok(()) => {
                warn!(key = %key, error = %cause, "delete failed, file restored");
                cause
            }
            Err(restore_err) => {
                error!(
                    key = %key,
                    delete_error = %cause,
                    restore_error = %restore_err,
                    "delete failed and file could not be restored"
                );
                VaultError::corrupted(
                    key,
                    format!("delete failed ({}); restoring the file failed ({})", cause, restore_err),
                )
            }
        }
    }

    /// Record the new content. A failure leaves a stale record, which
    /// `file_record` reports as `Corrupted` until the next write.
    fn save_record(&self, key: &str, content: &[u8], number: u64) {
        let result = FileRecord::new(key, content, number)
            .to_document()
            .and_then(|document| {
                self.versions
                    .metadata()
                    .upsert_document(FILE_COLLECTION, key, document)
                    .map_err(|e| e.into_vault("save_record", key))
            });

        if let Err(e) = result {
            warn!(key = %key, error = %e, "failed to save file record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_storage::MemoryBackend;
    use crate::metadata::InMemoryMetadataStore;

    fn setup() -> (FileSystem, Session) {
        let versions = Arc::new(VersionStore::new(Arc::new(InMemoryMetadataStore::new())));
        let fs = FileSystem::new(
            Arc::new(MemoryBackend::new()),
            versions,
            Arc::new(ReadCache::new()),
        );
        let root = SandboxRoot::new("alice").unwrap();
        fs.provision_root(&root).unwrap();
        (fs, Session::new("alice", root))
    }

    #[test]
    fn test_create_read_update() {
        let (fs, session) = setup();

        assert_eq!(fs.create_file(&session, "notes.txt", b"hello").unwrap(), 1);
        assert_eq!(fs.read_file(&session, "notes.txt").unwrap(), b"hello");

        assert_eq!(fs.update_file(&session, "notes.txt", b"hello world").unwrap(), 2);
        assert_eq!(fs.read_file(&session, "notes.txt").unwrap(), b"hello world");
        assert_eq!(fs.latest_version(&session, "notes.txt").unwrap(), 2);
    }

    #[test]
    fn test_write_populates_cache() {
        let (fs, session) = setup();
        fs.create_file(&session, "a.txt", b"a").unwrap();

        assert_eq!(fs.cache().get("alice/a.txt"), Some(b"a".to_vec()));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (fs, session) = setup();
        assert!(matches!(
            fs.update_file(&session, "nope.txt", b"x"),
            Err(VaultError::NotFound(_))
        ));
        assert_eq!(fs.latest_version(&session, "nope.txt").unwrap(), 0);
    }

    #[test]
    fn test_file_record_tracks_latest() {
        let (fs, session) = setup();
        fs.create_file(&session, "a.txt", b"one").unwrap();
        fs.update_file(&session, "a.txt", b"two!").unwrap();

        let record = fs.file_record(&session, "a.txt").unwrap();
        assert_eq!(record.latest_version, 2);
        assert_eq!(record.size_bytes, 4);
        assert!(record.matches(b"two!"));
    }

    #[test]
    fn test_root_is_not_a_file() {
        let (fs, session) = setup();
        assert!(matches!(
            fs.create_file(&session, ".", b"x"),
            Err(VaultError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_parent_directory() {
        let (fs, session) = setup();
        assert!(matches!(
            fs.create_file(&session, "docs/a.txt", b"x"),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_change_dir_state_machine() {
        let (fs, mut session) = setup();
        fs.create_dir(&session, "docs").unwrap();

        fs.change_dir(&mut session, "docs").unwrap();
        assert_eq!(session.current_dir(), "/docs");

        assert!(matches!(
            fs.change_dir(&mut session, "missing"),
            Err(VaultError::NotFound(_))
        ));
        assert_eq!(session.current_dir(), "/docs");

        fs.change_dir(&mut session, "..").unwrap();
        assert_eq!(session.current_dir(), "/");

        assert!(matches!(
            fs.change_dir(&mut session, ".."),
            Err(VaultError::PermissionDenied(_))
        ));
        assert_eq!(session.current_dir(), "/");
    }

    #[test]
    fn test_cannot_remove_current_directory() {
        let (fs, mut session) = setup();
        fs.create_dir(&session, "docs").unwrap();
        fs.change_dir(&mut session, "docs").unwrap();

        assert!(matches!(
            fs.remove_dir(&session, "/docs"),
            Err(VaultError::InvalidInput(_))
        ));
        assert!(matches!(
            fs.remove_dir(&session, "/"),
            Err(VaultError::PermissionDenied(_))
        ));
    }
}
