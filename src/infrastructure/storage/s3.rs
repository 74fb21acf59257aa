use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use tracing::{debug, info, warn};

use super::{FileData, ObjectStore, StorageError, StoredObject, file_name_of};

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
}

impl StorageService {
    pub fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!("✅ Connected to S3 (MinIO) at {}", endpoint);

        Self { client }
    }

    async fn require_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        if self.bucket_exists(bucket).await? {
            Ok(())
        } else {
            warn!(bucket, "Bucket does not exist");
            Err(StorageError::bucket_not_found(bucket))
        }
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = err.into_service_error();
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::Unexpected(err.to_string()))
                }
            }
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<FileData, StorageError> {
        self.require_bucket(bucket).await?;

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let err = err.into_service_error();
                if err.is_no_such_key() {
                    warn!(bucket, key, "Object does not exist");
                    StorageError::key_not_found(bucket, key)
                } else {
                    StorageError::Download(err.to_string())
                }
            })?;

        let content_type = response
            .content_type()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM.essence_str())
            .to_string();

        let content = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Download(e.to_string()))?
            .into_bytes();

        debug!(bucket, key, bytes = content.len(), "Downloaded object");

        Ok(FileData {
            content,
            content_type,
            file_name: file_name_of(key).to_string(),
        })
    }

    async fn put_object(
        &self,
        file: FileData,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject, StorageError> {
        self.require_bucket(bucket).await?;

        let size = file.content.len();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(file.content))
            .content_type(file.content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.into_service_error().to_string()))?;

        debug!(bucket, key, bytes = size, "Uploaded object");

        Ok(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            location: format!("{}/{}", bucket, key),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete(e.into_service_error().to_string()))?;

        Ok(())
    }
}
