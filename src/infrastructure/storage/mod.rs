use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod s3;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    NotFound(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Delete failed: {0}")]
    Delete(String),

    #[error("Unexpected response from object store: {0}")]
    Unexpected(String),
}

impl StorageError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bucket_not_found(bucket: &str) -> Self {
        Self::NotFound(format!("Bucket {bucket} does not exist."))
    }

    pub fn key_not_found(bucket: &str, key: &str) -> Self {
        Self::NotFound(format!(
            "File in bucket[{bucket}] by key[{key}] does not exist"
        ))
    }
}

/// A blob together with the metadata needed to store or restore it.
#[derive(Debug, Clone)]
pub struct FileData {
    pub content: Bytes,
    pub content_type: String,
    pub file_name: String,
}

/// Where a blob ended up after `put_object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub location: String,
}

/// Bucket + key addressed blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<FileData, StorageError>;

    async fn put_object(
        &self,
        file: FileData,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject, StorageError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}

/// Last path component of an object key.
pub fn file_name_of(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}
