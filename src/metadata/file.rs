//! # File Metadata Store
//!
//! Durable document store: one JSON file per document under
//! `<dir>/<collection>/<id>.json`, where the id is base64url-encoded so
//! storage keys containing `/` map to flat file names.
//!
//! Each file holds an envelope `{ "checksum": crc32, "document": ... }`.
//! The checksum covers the canonical serialisation of `document`.
//!
//! ## Invariants
//!
//! - Writes go to a temporary file which is then renamed over the target
//! - A document whose envelope fails to parse or verify is `Corrupted`
//! - Mutations are serialised by a store-wide mutex

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::checksum::{document_checksum, verify_document};
use super::errors::{MetadataError, MetadataResult};
use super::store::{append_to_history, MetadataStore, HISTORY_COLLECTION};
use crate::versioning::Version;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    checksum: u32,
    document: Value,
}

/// Document store rooted at a directory
#[derive(Debug)]
pub struct FileMetadataStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileMetadataStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl AsRef<Path>) -> MetadataResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| io_error("open", &root, e))?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, collection: &str, id: &str) -> PathBuf {
        self.root
            .join(collection)
            .join(format!("{}.json", URL_SAFE_NO_PAD.encode(id.as_bytes())))
    }

    fn load(&self, collection: &str, id: &str) -> MetadataResult<Option<Value>> {
        let path = self.document_path(collection, id);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", &path, e)),
        };

        let target = format!("{}/{}", collection, id);
        let envelope: Envelope =
            serde_json::from_slice(&bytes).map_err(|e| MetadataError::Corrupted {
                target: target.clone(),
                reason: format!("invalid envelope: {}", e),
            })?;

        verify_document(&target, &envelope.document, envelope.checksum)?;

        Ok(Some(envelope.document))
    }

    fn store(&self, collection: &str, id: &str, document: Value) -> MetadataResult<()> {
        let path = self.document_path(collection, id);
        let dir = self.root.join(collection);
        fs::create_dir_all(&dir).map_err(|e| io_error("create_dir", &dir, e))?;

        let envelope = Envelope {
            checksum: document_checksum(&document)?,
            document,
        };
        let bytes = serde_json::to_vec_pretty(&envelope).map_err(|e| MetadataError::Corrupted {
            target: format!("{}/{}", collection, id),
            reason: e.to_string(),
        })?;

        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).map_err(|e| io_error("write", &tmp, e))?;
        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| io_error("write", &tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error("rename", &path, e))?;

        Ok(())
    }

    fn remove(&self, collection: &str, id: &str) -> MetadataResult<bool> {
        let path = self.document_path(collection, id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("delete", &path, e)),
        }
    }
}

fn io_error(op: &str, path: &Path, err: io::Error) -> MetadataError {
    MetadataError::Unavailable(format!("{} {}: {}", op, path.display(), err))
}

impl MetadataStore for FileMetadataStore {
    fn find_document(&self, collection: &str, id: &str) -> MetadataResult<Option<Value>> {
        self.load(collection, id)
    }

    fn insert_document(&self, collection: &str, id: &str, document: Value) -> MetadataResult<()> {
        let _guard = self.write_lock.lock();

        if self.document_path(collection, id).exists() {
            return Err(MetadataError::DuplicateDocument {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        self.store(collection, id, document)
    }

    fn update_document(&self, collection: &str, id: &str, document: Value) -> MetadataResult<()> {
        let _guard = self.write_lock.lock();

        if !self.document_path(collection, id).exists() {
            return Err(MetadataError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        self.store(collection, id, document)
    }

    fn delete_document(&self, collection: &str, id: &str) -> MetadataResult<bool> {
        let _guard = self.write_lock.lock();
        self.remove(collection, id)
    }

    fn append_version(
        &self,
        filename: &str,
        version: &Version,
        expected_latest: u64,
    ) -> MetadataResult<()> {
        let _guard = self.write_lock.lock();

        let existing = self.load(HISTORY_COLLECTION, filename)?;
        let updated = append_to_history(filename, existing, version, expected_latest)?;
        self.store(HISTORY_COLLECTION, filename, updated)
    }
}
