//! S3 image store.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use mime::Mime;
use tracing::debug;

use domains::{DomainError, DomainResult, MediaStorage, StoredImage};

pub struct S3MediaStore {
    client: Client,
    bucket: String,
    /// Public base URL of the bucket (CDN or website endpoint), no trailing
    /// slash.
    public_base: String,
}

impl S3MediaStore {
    pub fn new(client: Client, bucket: impl Into<String>, public_base: impl Into<String>) -> Self {
        let public_base = public_base.into();
        S3MediaStore {
            client,
            bucket: bucket.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Builds a client from the ambient AWS environment.
    pub async fn from_env(bucket: impl Into<String>, public_base: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), bucket, public_base)
    }
}

#[async_trait]
impl MediaStorage for S3MediaStore {
    async fn upload(
        &self,
        data: Bytes,
        folder: &str,
        content_type: &Mime,
    ) -> DomainResult<StoredImage> {
        let key = super::storage_key(&data, folder, content_type);
        let bytes = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type.as_ref())
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(DomainError::upstream)?;
        debug!(key = %key, bytes, "image stored");
        Ok(StoredImage {
            url: format!("{}/{key}", self.public_base),
            storage_key: key,
        })
    }

    async fn delete(&self, storage_key: &str) -> DomainResult<()> {
        // S3 deletes are idempotent; a missing key still succeeds.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(DomainError::upstream)?;
        Ok(())
    }
}
