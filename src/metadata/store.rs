//! # Metadata Store Trait
//!
//! Document-store abstraction behind version histories, file records and
//! user accounts. Documents are `serde_json::Value`s addressed by
//! `(collection, id)`.
//!
//! ## Invariants
//!
//! - `append_version` is a conditional write: it succeeds only when the
//!   stored latest number equals `expected_latest`, and it is atomic with
//!   respect to every other operation on the same store
//! - "Not found" is `Ok(None)` for lookups and `MetadataError::NotFound`
//!   for updates

use std::fmt::Debug;

use serde_json::Value;

use super::errors::{MetadataError, MetadataResult};
use crate::versioning::{Version, VersionHistory};

/// Collection holding one `VersionHistory` per storage key
pub const HISTORY_COLLECTION: &str = "versions";

/// Collection holding one `FileRecord` per storage key
pub const FILE_COLLECTION: &str = "files";

/// Collection holding user accounts
pub const USER_COLLECTION: &str = "users";

/// Persistent document store
pub trait MetadataStore: Send + Sync + Debug {
    /// Fetch a document
    fn find_document(&self, collection: &str, id: &str) -> MetadataResult<Option<Value>>;

    /// Insert a new document, failing if the id is taken
    fn insert_document(&self, collection: &str, id: &str, document: Value) -> MetadataResult<()>;

    /// Replace an existing document
    fn update_document(&self, collection: &str, id: &str, document: Value) -> MetadataResult<()>;

    /// Delete a document, returning whether it existed
    fn delete_document(&self, collection: &str, id: &str) -> MetadataResult<bool>;

    /// Append `version` to the history of `filename` if its latest number
    /// is still `expected_latest`
    fn append_version(
        &self,
        filename: &str,
        version: &Version,
        expected_latest: u64,
    ) -> MetadataResult<()>;

    /// Insert or replace a document
    fn upsert_document(&self, collection: &str, id: &str, document: Value) -> MetadataResult<()> {
        match self.update_document(collection, id, document.clone()) {
            Err(MetadataError::NotFound { .. }) => self.insert_document(collection, id, document),
            other => other,
        }
    }

    fn find_history(&self, filename: &str) -> MetadataResult<Option<VersionHistory>> {
        self.find_document(HISTORY_COLLECTION, filename)?
            .map(|document| decode_history(filename, document))
            .transpose()
    }

    /// Latest version number, 0 when no history exists
    fn latest_version(&self, filename: &str) -> MetadataResult<u64> {
        Ok(self
            .find_history(filename)?
            .map(|history| history.latest_number())
            .unwrap_or(0))
    }

    /// All versions in ascending order, empty when no history exists
    fn list_versions(&self, filename: &str) -> MetadataResult<Vec<Version>> {
        Ok(self
            .find_history(filename)?
            .map(VersionHistory::into_versions)
            .unwrap_or_default())
    }

    fn delete_history(&self, filename: &str) -> MetadataResult<bool> {
        self.delete_document(HISTORY_COLLECTION, filename)
    }
}

/// Decode and validate a stored history document
pub fn decode_history(filename: &str, document: Value) -> MetadataResult<VersionHistory> {
    let history: VersionHistory =
        serde_json::from_value(document).map_err(|e| MetadataError::Corrupted {
            target: format!("{}/{}", HISTORY_COLLECTION, filename),
            reason: e.to_string(),
        })?;

    history.validate().map_err(|reason| MetadataError::Corrupted {
        target: format!("{}/{}", HISTORY_COLLECTION, filename),
        reason,
    })?;

    Ok(history)
}

pub fn encode_history(history: &VersionHistory) -> MetadataResult<Value> {
    serde_json::to_value(history).map_err(|e| MetadataError::Corrupted {
        target: format!("{}/{}", HISTORY_COLLECTION, history.filename()),
        reason: e.to_string(),
    })
}

/// Apply a conditional append to the current stored history document.
///
/// Stores call this while holding their own write lock so the
/// check-and-append is atomic.
pub fn append_to_history(
    filename: &str,
    existing: Option<Value>,
    version: &Version,
    expected_latest: u64,
) -> MetadataResult<Value> {
    let mut history = match existing {
        Some(document) => decode_history(filename, document)?,
        None => VersionHistory::new(filename),
    };

    let found = history.latest_number();
    if found != expected_latest {
        return Err(MetadataError::Conflict {
            filename: filename.to_string(),
            expected: expected_latest,
            found,
        });
    }

    history
        .push(version.clone())
        .map_err(|next| MetadataError::Corrupted {
            target: format!("{}/{}", HISTORY_COLLECTION, filename),
            reason: format!(
                "version {} does not follow {} (next is {})",
                version.number(),
                found,
                next
            ),
        })?;

    encode_history(&history)
}
