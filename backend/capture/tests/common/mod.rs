#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use doorcam_capture::{CaptureService, PipelineSettings};
use doorcam_core::{BlobHandle, BlobStore, BlobStoreStatus, DocumentStore};
use doorcam_media::ToolLocator;
use serde_json::Value;

#[path = "../../../media/tests/common/fake_tools.rs"]
mod fake_tools;

pub use fake_tools::fake_tool;

pub const SOURCE: &str = "http://cam.local/video";

/// In-memory blob store that records writes and can be told to fail.
#[derive(Default)]
pub struct MemoryBlobs {
    pub writes: Mutex<Vec<(String, String, usize)>>,
    /// Writes whose key starts with this prefix fail.
    pub fail_prefix: Option<&'static str>,
    pub unconfigured: bool,
    /// Writes never complete.
    pub hang: bool,
}

impl MemoryBlobs {
    pub fn failing(prefix: &'static str) -> Self {
        Self {
            fail_prefix: Some(prefix),
            ..Default::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            unconfigured: true,
            ..Default::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.writes.lock().unwrap().iter().map(|(k, _, _)| k.clone()).collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    fn name(&self) -> &str {
        "memory"
    }

    fn status(&self) -> BlobStoreStatus {
        BlobStoreStatus {
            backend: "memory".into(),
            configured: !self.unconfigured,
            location: None,
            missing: if self.unconfigured {
                vec!["DOORCAM_STORAGE_ENDPOINT".into()]
            } else {
                Vec::new()
            },
        }
    }

    async fn write(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<BlobHandle> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail_prefix.is_some_and(|p| key.starts_with(p)) {
            bail!("injected write failure for {key}");
        }
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string(), data.len()));
        Ok(BlobHandle {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size: data.len(),
        })
    }

    async fn resolve_url(&self, handle: &BlobHandle) -> Result<String> {
        Ok(format!("https://blobs.test/{}", handle.key))
    }
}

/// In-memory document store with an optional injected failure.
#[derive(Default)]
pub struct MemoryDocs {
    pub docs: Mutex<Vec<(String, String, Value)>>,
    pub fail: bool,
}

impl MemoryDocs {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.docs.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocs {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create(&self, collection: &str, fields: Value) -> Result<String> {
        if self.fail {
            bail!("injected document store outage");
        }
        let mut docs = self.docs.lock().unwrap();
        let id = format!("doc{:017}", docs.len());
        docs.push((collection.to_string(), id.clone(), fields));
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .docs
            .lock()
            .unwrap()
            .iter()
            .find(|(c, i, _)| c == collection && i == id)
            .map(|(_, _, v)| v.clone()))
    }

    async fn list_recent(&self, collection: &str, limit: usize) -> Result<Vec<(String, Value)>> {
        Ok(self
            .docs
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|(c, _, _)| c == collection)
            .take(limit)
            .map(|(_, i, v)| (i.clone(), v.clone()))
            .collect())
    }
}

pub fn settings(temp_dir: &Path, source: Option<&str>) -> PipelineSettings {
    PipelineSettings {
        source_url: source.map(str::to_string),
        temp_dir: temp_dir.to_path_buf(),
        store_timeout: Duration::from_secs(5),
        probe_timeout: Duration::from_millis(500),
        advanced_probe_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

pub fn service_with(
    settings: PipelineSettings,
    tool: &Path,
    blobs: Arc<dyn BlobStore>,
    docs: Arc<dyn DocumentStore>,
) -> CaptureService {
    CaptureService::new(
        settings,
        ToolLocator::default().with_override(tool),
        blobs,
        docs,
        reqwest::Client::new(),
    )
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
