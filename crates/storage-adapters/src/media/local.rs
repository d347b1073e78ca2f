//! Local filesystem image store.
//!
//! Files land under a root directory in the shared sharded layout and are
//! served back by the HTTP layer as static files under the configured URL
//! prefix.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use tokio::fs;
use tracing::debug;

use domains::{DomainError, DomainResult, MediaStorage, StoredImage};

pub struct LocalMediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalMediaStore {
    /// `root` is the upload directory (e.g. `./data/uploads`); `url_prefix`
    /// is where the HTTP layer serves that directory (e.g. `/uploads`).
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into();
        LocalMediaStore {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    fn disk_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(key.split('/'));
        path
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStore {
    async fn upload(
        &self,
        data: Bytes,
        folder: &str,
        content_type: &Mime,
    ) -> DomainResult<StoredImage> {
        let key = super::storage_key(&data, folder, content_type);
        let path = self.disk_path(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(DomainError::upstream)?;
        }
        fs::write(&path, &data)
            .await
            .map_err(DomainError::upstream)?;
        debug!(key = %key, bytes = data.len(), "image stored");
        Ok(StoredImage {
            url: format!("{}/{key}", self.url_prefix),
            storage_key: key,
        })
    }

    async fn delete(&self, storage_key: &str) -> DomainResult<()> {
        // Keys come from our own rows, but never follow one out of the root.
        if storage_key.starts_with('/') || storage_key.split('/').any(|part| part == "..") {
            return Err(DomainError::upstream("refusing storage key outside the media root"));
        }
        match fs::remove_file(self.disk_path(storage_key)).await {
            Ok(()) => Ok(()),
            // Release is idempotent; a missing file is already released.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DomainError::upstream(err)),
        }
    }
}
