//! Storage configuration and blob store construction.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Result};
use doorcam_core::BlobStore;
use serde::Serialize;
use tracing::{info, warn};

use crate::http::HttpBlobStore;
use crate::local::LocalBlobStore;
use crate::unconfigured::UnconfiguredBlobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Http,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "http" => Ok(Self::Http),
            other => bail!("unknown storage backend {other:?} (expected local or http)"),
        }
    }
}

/// Blob storage settings. Fields a backend needs may be absent; see
/// [`StorageConfig::missing_fields`].
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub media_dir: PathBuf,
    pub public_base_url: Option<String>,
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

impl StorageConfig {
    /// Environment variable names of required settings that are unset.
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if is_blank(&self.public_base_url) {
            missing.push("DOORCAM_PUBLIC_BASE_URL".to_string());
        }
        if self.backend == StorageBackend::Http && is_blank(&self.endpoint) {
            missing.push("DOORCAM_STORAGE_ENDPOINT".to_string());
        }
        missing
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Build the configured blob store. Incomplete settings yield an
/// [`UnconfiguredBlobStore`] rather than an error so the service can still
/// start and report what is missing.
pub fn build_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    let missing = config.missing_fields();
    if !missing.is_empty() {
        warn!(backend = %config.backend, missing = ?missing, "Blob storage is not configured");
        return Ok(Arc::new(UnconfiguredBlobStore::new(config.backend.as_str(), missing)));
    }

    let public_base_url = config.public_base_url.clone().unwrap_or_default();
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Local => {
            info!(root = %config.media_dir.display(), "Using local blob storage");
            Arc::new(LocalBlobStore::new(&config.media_dir, public_base_url))
        }
        StorageBackend::Http => {
            let endpoint = config.endpoint.clone().unwrap_or_default();
            info!(endpoint = %endpoint, "Using HTTP blob storage");
            Arc::new(
                HttpBlobStore::new(endpoint, config.token.clone())?
                    .with_public_base_url(public_base_url),
            )
        }
    };
    Ok(store)
}
