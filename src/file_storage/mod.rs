//! # File Storage
//!
//! Raw blob backends and the versioned, sandboxed `FileSystem` built on
//! top of them.

pub mod backend;
pub mod errors;
pub mod filesystem;
pub mod local;
pub mod memory;
pub mod record;

pub use backend::{DirEntry, EntryKind, StorageBackend};
pub use errors::{StorageError, StorageResult};
pub use filesystem::{CreatePolicy, DeletePolicy, FileSystem, FileSystemOptions};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use record::{content_checksum, FileRecord};
