//! # Version Store
//!
//! Append-only version history per filename, persisted through a
//! `MetadataStore`.
//!
//! ## Invariants
//!
//! - For a given filename, version numbers run 1..=n with no gaps or
//!   duplicates
//! - Appends to one filename are serialised by the lock table; appends to
//!   different filenames never wait on each other
//! - Every append is conditional on the latest number it observed, so a
//!   writer in another process cannot be silently overwritten
//! - An append that fails with a timeout or an unavailable store is checked
//!   against the stored history before the failure is reported; a
//!   `StorageTimeout` with op [`APPEND_OP`] means the append may still land

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::lock_table::{FileLock, LockTable};
use super::version::Version;
use crate::errors::{VaultError, VaultResult};
use crate::metadata::{MetadataError, MetadataStore};

/// Default number of re-attempts after a conflicting append
pub const DEFAULT_MAX_APPEND_RETRIES: u32 = 3;

/// Operation name carried by errors from the conditional append itself
pub const APPEND_OP: &str = "append_version";

/// Version history engine
#[derive(Debug)]
pub struct VersionStore {
    store: Arc<dyn MetadataStore>,
    locks: LockTable,
    max_append_retries: u32,
}

impl VersionStore {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            locks: LockTable::new(),
            max_append_retries: DEFAULT_MAX_APPEND_RETRIES,
        }
    }

    pub fn with_max_append_retries(mut self, retries: u32) -> Self {
        self.max_append_retries = retries;
        self
    }

    /// Underlying document store
    pub fn metadata(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    /// Latest version number, 0 if the file has no history
    pub fn latest_version(&self, filename: &str) -> VaultResult<u64> {
        validate_filename(filename)?;
        self.store
            .latest_version(filename)
            .map_err(|e| e.into_vault("latest_version", filename))
    }

    /// All versions in ascending order, empty if the file is unknown
    pub fn all_versions(&self, filename: &str) -> VaultResult<Vec<Version>> {
        validate_filename(filename)?;
        let versions = self
            .store
            .list_versions(filename)
            .map_err(|e| e.into_vault("all_versions", filename))?;
        debug!(filename, count = versions.len(), "loaded version history");
        Ok(versions)
    }

    /// A single version by number
    pub fn version(&self, filename: &str, number: u64) -> VaultResult<Version> {
        self.all_versions(filename)?
            .into_iter()
            .find(|v| v.number() == number)
            .ok_or_else(|| VaultError::NotFound(format!("version {} of '{}'", number, filename)))
    }

    /// Append `content` as the next version and return its number
    pub fn add_version(&self, filename: &str, content: &[u8]) -> VaultResult<u64> {
        validate_filename(filename)?;
        let lock = self.lock(filename);
        self.add_version_locked(&lock, content)
    }

    /// Take the append lock for `filename`.
    ///
    /// Callers that must order another write with the append (the
    /// filesystem's raw content write) hold this across both and then call
    /// [`add_version_locked`](Self::add_version_locked).
    pub fn lock(&self, filename: &str) -> FileLock<'_> {
        self.locks.acquire(filename)
    }

    /// Append under an already-held lock
    pub fn add_version_locked(&self, lock: &FileLock<'_>, content: &[u8]) -> VaultResult<u64> {
        let filename = lock.filename();
        if !lock.belongs_to(&self.locks) {
            return Err(VaultError::InvalidInput(format!(
                "lock for '{}' was issued by another version store",
                filename
            )));
        }

        let mut last_conflict = (0, 0);
        for attempt in 0..=self.max_append_retries {
            let expected = self
                .store
                .latest_version(filename)
                .map_err(|e| e.into_vault("add_version", filename))?;
            let version = Version::new(expected + 1, content.to_vec());

            match self.store.append_version(filename, &version, expected) {
                Ok(()) => {
                    info!(
                        filename,
                        version = version.number(),
                        size_bytes = content.len(),
                        "recorded version"
                    );
                    return Ok(version.number());
                }
                Err(MetadataError::Conflict { found, .. }) => {
                    warn!(filename, expected, found, attempt, "version append conflicted");
                    last_conflict = (expected, found);
                }
                Err(e @ (MetadataError::Timeout { .. } | MetadataError::Unavailable(_))) => {
                    if self.is_recorded(filename, &version) {
                        warn!(
                            filename,
                            version = version.number(),
                            error = %e,
                            "append reported failure but was recorded"
                        );
                        return Ok(version.number());
                    }
                    return Err(e.into_vault(APPEND_OP, filename));
                }
                Err(e) => return Err(e.into_vault(APPEND_OP, filename)),
            }
        }

        Err(VaultError::ConcurrencyConflict {
            filename: filename.to_string(),
            expected: last_conflict.0,
            found: last_conflict.1,
        })
    }

    /// Whether `version` is already part of the stored history.
    ///
    /// A failed lookup counts as not recorded.
    fn is_recorded(&self, filename: &str, version: &Version) -> bool {
        match self.store.find_history(filename) {
            Ok(Some(history)) => history
                .versions()
                .iter()
                .any(|v| v.number() == version.number() && v.content() == version.content()),
            Ok(None) => false,
            Err(e) => {
                debug!(filename, error = %e, "could not confirm append outcome");
                false
            }
        }
    }

    /// Drop the whole history of `filename`
    pub fn purge(&self, filename: &str) -> VaultResult<bool> {
        validate_filename(filename)?;
        let lock = self.lock(filename);
        self.purge_locked(&lock)
    }

    pub fn purge_locked(&self, lock: &FileLock<'_>) -> VaultResult<bool> {
        let filename = lock.filename();
        let removed = self
            .store
            .delete_history(filename)
            .map_err(|e| e.into_vault("purge", filename))?;
        if removed {
            info!(filename, "purged version history");
        }
        Ok(removed)
    }
}

fn validate_filename(filename: &str) -> VaultResult<()> {
    if filename.is_empty() {
        return Err(VaultError::InvalidInput("filename must not be empty".to_string()));
    }
    Ok(())
}
