use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use doorcam_core::{BlobHandle, BlobStore, BlobStoreStatus};
use tracing::debug;

use crate::keys::{join_url, validate_key};

/// Blob store on the local filesystem, served back by the media router.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn name(&self) -> &str {
        "local"
    }

    fn status(&self) -> BlobStoreStatus {
        BlobStoreStatus {
            backend: self.name().to_string(),
            configured: true,
            location: Some(self.root.display().to_string()),
            missing: Vec::new(),
        }
    }

    async fn write(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<BlobHandle> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let size = data.len();
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(key, size, path = %path.display(), "Blob written");

        Ok(BlobHandle {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size,
        })
    }

    async fn resolve_url(&self, handle: &BlobHandle) -> Result<String> {
        let path = self.path_for(&handle.key)?;
        anyhow::ensure!(
            tokio::fs::try_exists(&path).await.unwrap_or(false),
            "blob {} does not exist",
            handle.key
        );
        Ok(join_url(&self.public_base_url, &handle.key))
    }
}
