use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::StorageError;
use super::traits::{BoxReader, ObjectStore};

/// In-process object store backed by a `HashMap`.
///
/// Contents are lost on restart.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    max_size: Option<u64>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects objects larger than `max_size` bytes.
    pub fn with_max_size(max_size: u64) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            max_size: Some(max_size),
        }
    }

    /// Snapshot of all stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map is still structurally valid.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if let Some(limit) = self.max_size
            && data.len() as u64 > limit
        {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit,
            });
        }
        self.lock().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn get_stream(&self, key: &str) -> Result<BoxReader, StorageError> {
        let data = self.get(key).await?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.lock().contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.lock()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}
