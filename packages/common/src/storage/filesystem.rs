use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::key::validate_key;
use super::traits::{BoxReader, ObjectStore};

/// Filesystem-backed object store.
///
/// Objects live directly under `base_path` as `{base_path}/{key}`. Writes go
/// through `{base_path}/.tmp` and are renamed into place, so a reader never
/// observes a partially written object.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemObjectStore {
    /// Create a new filesystem object store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        let store = Self {
            base_path,
            max_size,
        };
        store.ensure_ready().await?;
        Ok(store)
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_path.join(validate_key(key)?))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let object_path = self.object_path(key)?;

        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn get_stream(&self, key: &str) -> Result<BoxReader, StorageError> {
        let object_path = self.object_path(key)?;
        match fs::File::open(&object_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let object_path = self.object_path(key)?;
        Ok(fs::try_exists(&object_path).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let object_path = self.object_path(key)?;
        match fs::remove_file(&object_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_ready(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path).await?;
        fs::create_dir_all(self.base_path.join(".tmp")).await?;
        Ok(())
    }
}
