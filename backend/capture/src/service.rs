//! Caller-facing operation surface: the pipeline, the probes, and record reads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use doorcam_core::{
    AccessRecord, AccessStatus, BlobStore, BlobStoreStatus, CaptureError, DocumentStore,
    PipelineOutcome, ProbeResult,
};
use doorcam_logging::redact_sensitive_data;
use doorcam_media::{ToolLocator, ToolStatus};
use serde::Serialize;

use crate::pipeline::{CapturePipeline, PipelineSettings};
use crate::probes::{AdvancedProbeReport, SourceProbe, SourceProbeReport, StorageProbe};

/// Upper bound on records returned by one listing.
pub const MAX_RECENT_RECORDS: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl EnvironmentInfo {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub tool: ToolStatus,
    pub source: SourceStatus,
    pub storage: BlobStoreStatus,
    /// Live write check, bounded by the store timeout.
    pub storage_check: ProbeResult,
    pub documents: String,
    pub environment: EnvironmentInfo,
    pub checked_at: DateTime<Utc>,
}

pub struct CaptureService {
    pipeline: CapturePipeline,
    source_probe: SourceProbe,
    storage_probe: StorageProbe,
    locator: ToolLocator,
    blob_store: Arc<dyn BlobStore>,
    documents: Arc<dyn DocumentStore>,
}

impl CaptureService {
    /// Wire the service from explicitly constructed collaborators.
    pub fn new(
        settings: PipelineSettings,
        locator: ToolLocator,
        blob_store: Arc<dyn BlobStore>,
        documents: Arc<dyn DocumentStore>,
        http: reqwest::Client,
    ) -> Self {
        let source_probe = SourceProbe::new(http, settings.source_url.clone(), locator.clone())
            .with_timeouts(settings.probe_timeout, settings.advanced_probe_timeout);
        let storage_probe = StorageProbe::new(blob_store.clone(), settings.store_timeout);

        Self {
            pipeline: CapturePipeline::new(
                settings,
                locator.clone(),
                blob_store.clone(),
                documents.clone(),
            ),
            source_probe,
            storage_probe,
            locator,
            blob_store,
            documents,
        }
    }

    pub async fn run_capture_pipeline(
        &self,
        status: AccessStatus,
        duration_seconds: i64,
    ) -> Result<PipelineOutcome, CaptureError> {
        self.pipeline.run(status, duration_seconds).await
    }

    pub async fn probe_source(&self) -> Result<SourceProbeReport, CaptureError> {
        self.source_probe.probe().await
    }

    pub async fn probe_source_advanced(&self) -> Result<AdvancedProbeReport, CaptureError> {
        self.source_probe.probe_advanced().await
    }

    pub async fn test_stream(&self) -> ProbeResult {
        self.source_probe.test_stream().await
    }

    pub async fn probe_storage(&self) -> ProbeResult {
        self.storage_probe.probe().await
    }

    pub async fn tool_status(&self) -> ToolStatus {
        self.locator.status().await
    }

    pub async fn system_status(&self) -> SystemStatus {
        let source_url = self.source_probe.source_url();
        SystemStatus {
            version: env!("CARGO_PKG_VERSION"),
            tool: self.tool_status().await,
            source: SourceStatus {
                configured: source_url.is_some_and(|u| !u.trim().is_empty()),
                url: source_url.map(redact_sensitive_data),
            },
            storage: self.blob_store.status(),
            storage_check: self.probe_storage().await,
            documents: self.documents.name().to_string(),
            environment: EnvironmentInfo::current(),
            checked_at: Utc::now(),
        }
    }

    pub async fn record(&self, id: &str) -> Result<Option<AccessRecord>, CaptureError> {
        self.pipeline.persister().load(id).await
    }

    /// Every stored access record, newest first.
    pub async fn all_records(&self) -> Result<Vec<AccessRecord>, CaptureError> {
        self.pipeline.persister().recent(usize::MAX).await
    }

    /// Newest first; `limit` is clamped to `1..=MAX_RECENT_RECORDS`.
    pub async fn recent_records(&self, limit: usize) -> Result<Vec<AccessRecord>, CaptureError> {
        self.pipeline
            .persister()
            .recent(limit.clamp(1, MAX_RECENT_RECORDS))
            .await
    }
}
