//! In-memory metadata store
//!
//! Collections are nested maps behind one `RwLock`. Conditional appends run
//! under the write guard, so they are atomic with respect to every other
//! operation.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use super::errors::{MetadataError, MetadataResult};
use super::store::{append_to_history, MetadataStore, HISTORY_COLLECTION};
use crate::versioning::Version;

type Collections = HashMap<String, HashMap<String, Value>>;

/// Volatile document store, used when no metadata directory is configured
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    data: RwLock<Collections>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> MetadataResult<usize> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.get(collection).map(HashMap::len).unwrap_or(0))
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> MetadataError {
    MetadataError::Unavailable("metadata store lock poisoned".to_string())
}

impl MetadataStore for InMemoryMetadataStore {
    fn find_document(&self, collection: &str, id: &str) -> MetadataResult<Option<Value>> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.get(collection).and_then(|c| c.get(id)).cloned())
    }

    fn insert_document(&self, collection: &str, id: &str, document: Value) -> MetadataResult<()> {
        let mut data = self.data.write().map_err(poisoned)?;
        let coll = data.entry(collection.to_string()).or_default();

        if coll.contains_key(id) {
            return Err(MetadataError::DuplicateDocument {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        coll.insert(id.to_string(), document);
        Ok(())
    }

    fn update_document(&self, collection: &str, id: &str, document: Value) -> MetadataResult<()> {
        let mut data = self.data.write().map_err(poisoned)?;

        let doc = data
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| MetadataError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        *doc = document;
        Ok(())
    }

    fn delete_document(&self, collection: &str, id: &str) -> MetadataResult<bool> {
        let mut data = self.data.write().map_err(poisoned)?;

        if let Some(coll) = data.get_mut(collection) {
            Ok(coll.remove(id).is_some())
        } else {
            Ok(false)
        }
    }

    fn append_version(
        &self,
        filename: &str,
        version: &Version,
        expected_latest: u64,
    ) -> MetadataResult<()> {
        let mut data = self.data.write().map_err(poisoned)?;
        let coll = data.entry(HISTORY_COLLECTION.to_string()).or_default();

        let updated = append_to_history(filename, coll.get(filename).cloned(), version, expected_latest)?;
        coll.insert(filename.to_string(), updated);
        Ok(())
    }
}
