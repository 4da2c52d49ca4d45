//! # Configuration
//!
//! JSON configuration file with defaults for everything except
//! `storage_dir`. Key material is never read from the file itself, only
//! from the environment variable it names.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::EncryptionKey;
use crate::errors::{VaultError, VaultResult};
use crate::file_storage::{CreatePolicy, DeletePolicy, FileSystemOptions};
use crate::logging::{self, LogFormat};
use crate::retry::RetryPolicy;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Encryption key from ${var} is unusable: {reason}")]
    Key { var: String, reason: String },
}

impl From<ConfigError> for VaultError {
    fn from(err: ConfigError) -> Self {
        VaultError::Config(err.to_string())
    }
}

/// Vault configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Blob storage directory (required)
    pub storage_dir: PathBuf,

    /// Metadata directory; the metadata store is in-memory when absent
    #[serde(default)]
    pub metadata_dir: Option<PathBuf>,

    /// Bound on every metadata store call (default 10s)
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,

    /// Re-attempts after a conflicting version append (default 3)
    #[serde(default = "default_max_append_retries")]
    pub max_append_retries: u32,

    /// Attempts for reads that hit a slow or unavailable store (default 3)
    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,

    #[serde(default)]
    pub create_policy: CreatePolicy,

    #[serde(default)]
    pub delete_policy: DeletePolicy,

    /// Environment variable holding a hex or base64 32-byte key
    #[serde(default)]
    pub encryption_key_env: Option<String>,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_op_timeout_ms() -> u64 {
    10_000
}

fn default_max_append_retries() -> u32 {
    3
}

fn default_read_attempts() -> u32 {
    3
}

impl VaultConfig {
    /// Configuration with defaults rooted at `storage_dir`
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            metadata_dir: None,
            op_timeout_ms: default_op_timeout_ms(),
            max_append_retries: default_max_append_retries(),
            read_attempts: default_read_attempts(),
            create_policy: CreatePolicy::default(),
            delete_policy: DeletePolicy::default(),
            encryption_key_env: None,
            log_format: LogFormat::default(),
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: VaultConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage_dir must not be empty".to_string()));
        }

        if self.op_timeout_ms == 0 {
            return Err(ConfigError::Invalid("op_timeout_ms must be > 0".to_string()));
        }

        if self.read_attempts == 0 {
            return Err(ConfigError::Invalid("read_attempts must be > 0".to_string()));
        }

        if let Some(metadata_dir) = &self.metadata_dir {
            if metadata_dir == &self.storage_dir {
                return Err(ConfigError::Invalid(
                    "metadata_dir must differ from storage_dir".to_string(),
                ));
            }
        }

        if let Some(var) = &self.encryption_key_env {
            if var.is_empty() {
                return Err(ConfigError::Invalid(
                    "encryption_key_env must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub fn filesystem_options(&self) -> FileSystemOptions {
        FileSystemOptions {
            create_policy: self.create_policy,
            delete_policy: self.delete_policy,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.read_attempts,
            ..RetryPolicy::default()
        }
    }

    /// Install the global log subscriber in `log_format`.
    ///
    /// `Vault::open` leaves the subscriber alone; call this once at startup.
    pub fn init_logging(&self) -> VaultResult<()> {
        logging::init(self.log_format)
    }

    /// Load the encryption key named by `encryption_key_env`, if any
    pub fn encryption_key(&self) -> ConfigResult<Option<EncryptionKey>> {
        let Some(var) = &self.encryption_key_env else {
            return Ok(None);
        };

        EncryptionKey::from_env(var)
            .map(Some)
            .map_err(|e| ConfigError::Key {
                var: var.clone(),
                reason: e.to_string(),
            })
    }
}
