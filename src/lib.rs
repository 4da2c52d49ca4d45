//! filevault - A versioned, sandboxed personal file store
//!
//! Every write becomes an immutable, numbered version. Files live under a
//! per-user sandbox root, reads go through an in-memory cache, and content
//! can optionally be compressed and encrypted by the caller.

pub mod auth;
pub mod cache;
pub mod codec;
pub mod config;
pub mod errors;
pub mod file_storage;
pub mod logging;
pub mod metadata;
pub mod retry;
pub mod sandbox;
pub mod session;
pub mod vault;
pub mod versioning;

pub use errors::{VaultError, VaultResult};
pub use file_storage::FileSystem;
pub use sandbox::{resolve_path, SandboxPath, SandboxRoot};
pub use session::Session;
pub use vault::Vault;
pub use versioning::{Version, VersionStore};
