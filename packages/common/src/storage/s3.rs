use std::io;

use ::s3::creds::Credentials;
use ::s3::error::S3Error;
use ::s3::{Bucket, BucketConfiguration, Region};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use tokio_util::bytes::Bytes;
use tokio_util::io::StreamReader;
use tracing::info;

use super::error::StorageError;
use super::traits::{BoxReader, ObjectStore};
use crate::config::S3Config;

/// S3-compatible object store (AWS S3, MinIO, ...).
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    path_style: bool,
    max_size: u64,
}

impl S3ObjectStore {
    pub fn new(config: &S3Config, max_size: u64) -> Result<Self, StorageError> {
        let region = match config.endpoint.as_deref() {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.to_string(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Backend(format!("invalid S3 region: {e}")))?,
        };

        let credentials = Credentials::new(
            Some(config.access_key.as_str()),
            Some(config.secret_key.as_str()),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid S3 credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(backend_error)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            region,
            credentials,
            path_style: config.path_style,
            max_size,
        })
    }
}

fn backend_error(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn object_error(key: &str, err: S3Error) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key.to_string()),
        other => backend_error(other),
    }
}

/// Map a failed or non-2xx S3 response to a storage error.
fn check_status(key: &str, result: Result<u16, S3Error>) -> Result<(), StorageError> {
    match result {
        Ok(code) if (200..300).contains(&code) => Ok(()),
        Ok(404) => Err(StorageError::NotFound(key.to_string())),
        Ok(code) => Err(StorageError::Backend(format!(
            "unexpected status {code} for object '{key}'"
        ))),
        Err(e) => Err(object_error(key, e)),
    }
}

/// Wrap a streamed object body as an `AsyncRead`, without buffering it.
fn body_reader<S>(key: &str, status: u16, body: S) -> Result<BoxReader, StorageError>
where
    S: Stream<Item = Result<Bytes, S3Error>> + Send + Unpin + 'static,
{
    check_status(key, Ok(status))?;
    let body = body.map_err(|e| io::Error::other(e.to_string()));
    Ok(Box::new(StreamReader::new(body)))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }
        let result = self
            .bucket
            .put_object(key, data)
            .await
            .map(|r| r.status_code());
        check_status(key, result)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| object_error(key, e))?;
        check_status(key, Ok(response.status_code()))?;
        Ok(response.bytes().to_vec())
    }

    async fn get_stream(&self, key: &str) -> Result<BoxReader, StorageError> {
        let response = self
            .bucket
            .get_object_stream(key)
            .await
            .map_err(|e| object_error(key, e))?;
        body_reader(key, response.status_code, response.bytes)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let result = self.bucket.head_object(key).await.map(|(_, code)| code);
        match check_status(key, result) {
            Ok(()) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let result = self
            .bucket
            .delete_object(key)
            .await
            .map(|r| r.status_code());
        check_status(key, result)
    }

    async fn ensure_ready(&self) -> Result<(), StorageError> {
        if self.bucket.exists().await.map_err(backend_error)? {
            return Ok(());
        }

        info!(bucket = %self.bucket.name(), "S3 bucket not found, creating");
        let config = BucketConfiguration::default();
        let response = if self.path_style {
            Bucket::create_with_path_style(
                &self.bucket.name(),
                self.region.clone(),
                self.credentials.clone(),
                config,
            )
            .await
        } else {
            Bucket::create(
                &self.bucket.name(),
                self.region.clone(),
                self.credentials.clone(),
                config,
            )
            .await
        }
        .map_err(backend_error)?;

        if !response.success() {
            return Err(StorageError::Backend(format!(
                "failed to create bucket '{}': status {}",
                self.bucket.name(),
                response.response_code
            )));
        }
        Ok(())
    }
}
