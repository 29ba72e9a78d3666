use anyhow::{bail, Result};
use async_trait::async_trait;
use doorcam_core::{BlobHandle, BlobStore, BlobStoreStatus};

/// Stand-in for a backend whose settings are incomplete. Reports what is
/// missing and refuses every write.
pub struct UnconfiguredBlobStore {
    backend: String,
    missing: Vec<String>,
}

impl UnconfiguredBlobStore {
    pub fn new(backend: impl Into<String>, missing: Vec<String>) -> Self {
        Self {
            backend: backend.into(),
            missing,
        }
    }
}

#[async_trait]
impl BlobStore for UnconfiguredBlobStore {
    fn name(&self) -> &str {
        &self.backend
    }

    fn status(&self) -> BlobStoreStatus {
        BlobStoreStatus {
            backend: self.backend.clone(),
            configured: false,
            location: None,
            missing: self.missing.clone(),
        }
    }

    async fn write(&self, key: &str, _data: Vec<u8>, _content_type: &str) -> Result<BlobHandle> {
        bail!(
            "{} storage is not configured (missing {}); refusing to write {key}",
            self.backend,
            self.missing.join(", ")
        )
    }

    async fn resolve_url(&self, handle: &BlobHandle) -> Result<String> {
        bail!("{} storage is not configured; cannot resolve {}", self.backend, handle.key)
    }
}
