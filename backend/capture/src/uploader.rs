use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use doorcam_core::{BlobStore, CaptureError};
use tracing::{debug, error};

/// Default bound on a single blob store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Pushes local artifacts to the blob store and resolves their public URLs.
pub struct ArtifactUploader {
    store: Arc<dyn BlobStore>,
    timeout: Duration,
}

impl ArtifactUploader {
    pub fn new(store: Arc<dyn BlobStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Upload `local` under `key` and return its public URL.
    pub async fn upload(
        &self,
        local: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<String, CaptureError> {
        let fail = |message: String| {
            error!(key, error = %message, "Artifact upload failed");
            CaptureError::Upload {
                key: key.to_string(),
                message,
            }
        };

        let data = tokio::fs::read(local)
            .await
            .map_err(|e| fail(format!("failed to read {}: {e}", local.display())))?;
        let size = data.len();

        let handle = match tokio::time::timeout(self.timeout, self.store.write(key, data, content_type)).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => return Err(fail(format!("{e:#}"))),
            Err(_) => return Err(fail(format!("write timed out after {}s", self.timeout.as_secs()))),
        };

        let url = match tokio::time::timeout(self.timeout, self.store.resolve_url(&handle)).await {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => return Err(fail(format!("failed to resolve URL: {e:#}"))),
            Err(_) => return Err(fail(format!("URL resolution timed out after {}s", self.timeout.as_secs()))),
        };
        if url.trim().is_empty() {
            return Err(fail("store resolved an empty URL".to_string()));
        }

        debug!(key, size, backend = self.store.name(), "Artifact uploaded");
        Ok(url)
    }
}
