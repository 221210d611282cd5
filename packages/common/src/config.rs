use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::storage::{ObjectStore, StorageError};

/// Which object store implementation backs attachments.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Filesystem,
    Memory,
}

/// App-level object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Backend selection. Default: "s3".
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Maximum size of a single uploaded file in bytes. Default: 64 MiB.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default)]
    pub filesystem: FilesystemConfig,
    #[serde(default)]
    pub s3: S3Config,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemConfig {
    /// Directory holding the objects. Default: "./data/objects".
    #[serde(default = "default_filesystem_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    /// Custom endpoint (MinIO etc.). `None` uses AWS for `region`.
    #[serde(default = "default_s3_endpoint")]
    pub endpoint: Option<String>,
    #[serde(default = "default_s3_region")]
    pub region: String,
    #[serde(default = "default_s3_bucket")]
    pub bucket: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    /// Path-style addressing, required by MinIO. Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_backend() -> StorageBackend {
    StorageBackend::S3
}
fn default_max_file_size() -> u64 {
    64 * 1024 * 1024
}
fn default_filesystem_path() -> PathBuf {
    PathBuf::from("./data/objects")
}
fn default_s3_endpoint() -> Option<String> {
    Some("http://127.0.0.1:9000".into())
}
fn default_s3_region() -> String {
    "us-east-1".into()
}
fn default_s3_bucket() -> String {
    "patterns".into()
}
fn default_path_style() -> bool {
    true
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            path: default_filesystem_path(),
        }
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: default_s3_endpoint(),
            region: default_s3_region(),
            bucket: default_s3_bucket(),
            access_key: String::new(),
            secret_key: String::new(),
            path_style: default_path_style(),
        }
    }
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            max_file_size: default_max_file_size(),
            filesystem: FilesystemConfig::default(),
            s3: S3Config::default(),
        }
    }
}

impl StorageAppConfig {
    /// Construct the configured object store and make sure it is ready to use.
    pub async fn build_store(&self) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let store: Arc<dyn ObjectStore> = match self.backend {
            StorageBackend::Memory => Arc::new(
                crate::storage::memory::MemoryObjectStore::with_max_size(self.max_file_size),
            ),
            StorageBackend::Filesystem => Arc::new(
                crate::storage::filesystem::FilesystemObjectStore::new(
                    self.filesystem.path.clone(),
                    self.max_file_size,
                )
                .await?,
            ),
            #[cfg(feature = "object-storage")]
            StorageBackend::S3 => Arc::new(crate::storage::s3::S3ObjectStore::new(
                &self.s3,
                self.max_file_size,
            )?),
            #[cfg(not(feature = "object-storage"))]
            StorageBackend::S3 => {
                return Err(StorageError::Backend(
                    "S3 backend requires the `object-storage` feature".into(),
                ));
            }
        };
        store.ensure_ready().await?;
        Ok(store)
    }
}
