//! Per-filename append locks
//!
//! Entries are created on demand and removed when the last holder or waiter
//! releases, so the table only ever holds filenames with in-flight appends.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

/// Table of per-filename mutexes
#[derive(Debug, Default)]
pub struct LockTable {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock for `filename` is held.
    ///
    /// Locks are not reentrant: acquiring the same filename twice on one
    /// thread deadlocks.
    pub fn acquire(&self, filename: &str) -> FileLock<'_> {
        let entry = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(filename.to_string()).or_default())
        };

        FileLock {
            table: self,
            filename: filename.to_string(),
            guard: Some(entry.lock_arc()),
        }
    }

    /// Number of filenames with a live entry
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, filename: &str) {
        let mut locks = self.locks.lock();
        // The map holds one reference; anything more is a waiter
        if let Some(entry) = locks.get(filename) {
            if Arc::strong_count(entry) == 1 {
                locks.remove(filename);
            }
        }
    }
}

/// Exclusive hold on one filename's append lock
pub struct FileLock<'a> {
    table: &'a LockTable,
    filename: String,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl FileLock<'_> {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Whether this lock was issued by `table`
    pub(crate) fn belongs_to(&self, table: &LockTable) -> bool {
        std::ptr::eq(self.table, table)
    }
}

impl std::fmt::Debug for FileLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLock")
            .field("filename", &self.filename)
            .field("held", &self.guard.is_some())
            .finish()
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        // Drop the guard first so its Arc no longer counts as a holder
        drop(self.guard.take());
        self.table.release(&self.filename);
    }
}
