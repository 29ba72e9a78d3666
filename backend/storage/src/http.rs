//! Remote blob store reached over plain HTTP PUT.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use doorcam_core::{BlobHandle, BlobStore, BlobStoreStatus};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::keys::{join_url, validate_key};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct HttpBlobStore {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    public_base_url: Option<String>,
}

impl HttpBlobStore {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
            public_base_url: None,
        })
    }

    /// Serve download URLs from a different origin than the upload endpoint.
    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into());
        self
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    fn name(&self) -> &str {
        "http"
    }

    fn status(&self) -> BlobStoreStatus {
        BlobStoreStatus {
            backend: self.name().to_string(),
            configured: true,
            location: Some(self.endpoint.clone()),
            missing: Vec::new(),
        }
    }

    async fn write(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<BlobHandle> {
        validate_key(key)?;
        let url = join_url(&self.endpoint, key);
        let size = data.len();

        let mut request = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(data);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("PUT {key} failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(key, %status, "Blob upload rejected");
            bail!("PUT {key} returned {status}: {}", body.trim());
        }

        debug!(key, size, "Blob uploaded");
        Ok(BlobHandle {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size,
        })
    }

    async fn resolve_url(&self, handle: &BlobHandle) -> Result<String> {
        let base = self.public_base_url.as_deref().unwrap_or(&self.endpoint);
        Ok(join_url(base, &handle.key))
    }
}
