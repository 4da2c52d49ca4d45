//! # Metadata Store
//!
//! Persistent documents behind the vault: version histories, file records
//! and user accounts.
//!
//! - `InMemoryMetadataStore`: volatile, for tests and ephemeral vaults
//! - `FileMetadataStore`: one checksummed JSON file per document
//! - `TimeoutStore`: bounds every call on any other store by a deadline

mod checksum;
mod errors;
mod file;
mod memory;
mod store;
mod timeout;

pub use checksum::{document_checksum, verify_document};
pub use errors::{MetadataError, MetadataResult};
pub use file::FileMetadataStore;
pub use memory::InMemoryMetadataStore;
pub use store::{
    append_to_history, decode_history, encode_history, MetadataStore, FILE_COLLECTION,
    HISTORY_COLLECTION, USER_COLLECTION,
};
pub use timeout::{TimeoutStore, DEFAULT_OP_TIMEOUT};
