use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Object storage addressed by caller-chosen keys.
///
/// Implementations never retry. Deleting or reading a missing key must
/// surface as [`StorageError::NotFound`] so callers can tell "already gone"
/// apart from real failures.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Durably store `data` under `key`, overwriting any existing object.
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Retrieve all bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(key).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve an object as a streaming async reader.
    async fn get_stream(&self, key: &str) -> Result<BoxReader, StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete the object stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Prepare the backing namespace (bucket, directory) for use.
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
