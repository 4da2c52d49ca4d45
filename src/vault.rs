//! # Vault
//!
//! Wires a `VaultConfig` into a ready-to-use file store: blob backend,
//! deadline-bounded metadata store, version store, read cache, filesystem
//! and auth gateway.

use std::sync::Arc;

use tracing::info;

use crate::auth::{AuthService, MetadataUserRepository};
use crate::cache::ReadCache;
use crate::codec::{EncryptionKey, Pipeline};
use crate::config::VaultConfig;
use crate::errors::{VaultError, VaultResult};
use crate::file_storage::{FileSystem, LocalBackend, StorageBackend};
use crate::metadata::{FileMetadataStore, InMemoryMetadataStore, MetadataStore, TimeoutStore};
use crate::session::Session;
use crate::versioning::VersionStore;

#[derive(Debug)]
pub struct Vault {
    config: VaultConfig,
    filesystem: Arc<FileSystem>,
    auth: AuthService,
    encryption_key: Option<EncryptionKey>,
}

impl Vault {
    /// Open the stores named by `config`
    pub fn open(config: VaultConfig) -> VaultResult<Self> {
        config.validate()?;

        let backend: Arc<dyn StorageBackend> = Arc::new(
            LocalBackend::open(&config.storage_dir)
                .map_err(|e| e.into_vault("open", &config.storage_dir.display().to_string()))?,
        );

        let inner: Arc<dyn MetadataStore> = match &config.metadata_dir {
            Some(dir) => Arc::new(
                FileMetadataStore::open(dir)
                    .map_err(|e| e.into_vault("open", &dir.display().to_string()))?,
            ),
            None => Arc::new(InMemoryMetadataStore::new()),
        };
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            TimeoutStore::new(inner, config.op_timeout())
                .map_err(|e| e.into_vault("open", "metadata"))?,
        );

        Self::with_stores(config, backend, metadata)
    }

    /// Assemble a vault over caller-supplied stores
    pub fn with_stores(
        config: VaultConfig,
        backend: Arc<dyn StorageBackend>,
        metadata: Arc<dyn MetadataStore>,
    ) -> VaultResult<Self> {
        let encryption_key = config.encryption_key()?;

        let versions = Arc::new(
            VersionStore::new(Arc::clone(&metadata))
                .with_max_append_retries(config.max_append_retries),
        );
        let filesystem = Arc::new(
            FileSystem::new(backend, versions, Arc::new(ReadCache::new()))
                .with_options(config.filesystem_options()),
        );
        let auth = AuthService::new(
            Arc::new(MetadataUserRepository::new(metadata)),
            Arc::clone(&filesystem),
        );

        info!(
            storage_dir = %config.storage_dir.display(),
            persistent_metadata = config.metadata_dir.is_some(),
            encryption = encryption_key.is_some(),
            "vault opened"
        );

        Ok(Self {
            config,
            filesystem,
            auth,
            encryption_key,
        })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn filesystem(&self) -> &Arc<FileSystem> {
        &self.filesystem
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Read a file, retrying slow or unavailable storage per `read_attempts`
    pub fn read_file(&self, session: &Session, name: &str) -> VaultResult<Vec<u8>> {
        self.filesystem
            .read_file_retrying(session, name, &self.config.retry_policy())
    }

    /// Build a content pipeline from the configured key
    pub fn pipeline(&self, compress: bool, encrypt: bool) -> VaultResult<Pipeline> {
        let mut pipeline = Pipeline::new();
        if compress {
            pipeline = pipeline.compress();
        }
        if encrypt {
            let key = self.encryption_key.clone().ok_or_else(|| {
                VaultError::Config("encryption requested but no key is configured".to_string())
            })?;
            pipeline = pipeline.encrypt(key);
        }
        Ok(pipeline)
    }

    /// Encode `content` through `pipeline` and store it as a new version
    pub fn write_encoded(
        &self,
        session: &Session,
        name: &str,
        content: &[u8],
        pipeline: &Pipeline,
    ) -> VaultResult<u64> {
        let encoded = pipeline.encode(content)?;
        self.filesystem.create_file(session, name, &encoded)
    }

    /// Read a file and decode it through `pipeline`
    pub fn read_decoded(&self, session: &Session, name: &str, pipeline: &Pipeline) -> VaultResult<Vec<u8>> {
        let encoded = self.read_file(session, name)?;
        Ok(pipeline.decode(&encoded)?)
    }
}
