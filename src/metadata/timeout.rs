//! # Deadline-Enforcing Store
//!
//! Wraps any `MetadataStore` and bounds every call by a timeout. Calls run
//! on the blocking pool of a small tokio runtime owned by the store and are
//! awaited with `tokio::time::timeout`.
//!
//! A timed-out call returns `MetadataError::Timeout` with no partial
//! result. A call that has not started when its deadline passes never
//! runs. A call already inside the wrapped store cannot be interrupted and
//! may still complete, so a timed-out write has an unknown outcome until
//! state is re-read.
//!
//! The API is synchronous: methods must not be called from inside an async
//! runtime.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use super::errors::{MetadataError, MetadataResult};
use super::store::MetadataStore;
use crate::versioning::Version;

/// Default operation timeout
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on concurrently running metadata calls
const MAX_WORKERS: usize = 16;

pub struct TimeoutStore<S: MetadataStore + ?Sized + 'static> {
    inner: Arc<S>,
    timeout: Duration,
    runtime: Runtime,
}

impl<S: MetadataStore + ?Sized + 'static> TimeoutStore<S> {
    pub fn new(inner: Arc<S>, timeout: Duration) -> MetadataResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(MAX_WORKERS)
            .thread_name("filevault-metadata")
            .enable_time()
            .build()
            .map_err(|e| MetadataError::Unavailable(format!("failed to start workers: {}", e)))?;

        Ok(Self {
            inner,
            timeout,
            runtime,
        })
    }

    pub fn with_default_timeout(inner: Arc<S>) -> MetadataResult<Self> {
        Self::new(inner, DEFAULT_OP_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    fn run<T, F>(&self, op: &'static str, f: F) -> MetadataResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> MetadataResult<T> + Send + 'static,
    {
        let expired = Arc::new(AtomicBool::new(false));
        let inner = Arc::clone(&self.inner);
        let task = {
            let expired = Arc::clone(&expired);
            self.runtime.spawn_blocking(move || {
                if expired.load(Ordering::SeqCst) {
                    debug!(op, "skipping metadata operation queued past its deadline");
                    return Err(MetadataError::Timeout { op, after_ms: 0 });
                }
                f(&*inner)
            })
        };

        match self
            .runtime
            .block_on(async { tokio::time::timeout(self.timeout, task).await })
        {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(MetadataError::Unavailable(format!(
                "worker for {} failed: {}",
                op, join_err
            ))),
            Err(_) => {
                expired.store(true, Ordering::SeqCst);
                let after_ms = self.timeout.as_millis() as u64;
                warn!(op, after_ms, "metadata operation timed out");
                Err(MetadataError::Timeout { op, after_ms })
            }
        }
    }
}

impl<S: MetadataStore + ?Sized + 'static> fmt::Debug for TimeoutStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutStore")
            .field("inner", &self.inner)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<S: MetadataStore + ?Sized + 'static> MetadataStore for TimeoutStore<S> {
    fn find_document(&self, collection: &str, id: &str) -> MetadataResult<Option<Value>> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.run("find_document", move |s| s.find_document(&collection, &id))
    }

    fn insert_document(&self, collection: &str, id: &str, document: Value) -> MetadataResult<()> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.run("insert_document", move |s| {
            s.insert_document(&collection, &id, document)
        })
    }

    fn update_document(&self, collection: &str, id: &str, document: Value) -> MetadataResult<()> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.run("update_document", move |s| {
            s.update_document(&collection, &id, document)
        })
    }

    fn delete_document(&self, collection: &str, id: &str) -> MetadataResult<bool> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.run("delete_document", move |s| s.delete_document(&collection, &id))
    }

    fn append_version(
        &self,
        filename: &str,
        version: &Version,
        expected_latest: u64,
    ) -> MetadataResult<()> {
        let filename = filename.to_string();
        let version = version.clone();
        self.run("append_version", move |s| {
            s.append_version(&filename, &version, expected_latest)
        })
    }
}
