//! # Versioning
//!
//! Append-only, numbered version histories. Every content mutation of a
//! file becomes one immutable `Version`.

mod lock_table;
mod store;
mod version;

pub use lock_table::{FileLock, LockTable};
pub use store::{VersionStore, APPEND_OP, DEFAULT_MAX_APPEND_RETRIES};
pub use version::{Version, VersionHistory};
