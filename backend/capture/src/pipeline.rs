//! The capture-and-persist pipeline.
//!
//! One run: capture a clip, extract a thumbnail, upload both (video first),
//! persist the access record, and remove the local temp files on every exit
//! path. Any stage failure aborts the remaining stages.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use doorcam_core::{
    AccessStatus, BlobStore, CaptureDuration, CaptureError, CaptureRequest, CaptureResult,
    DocumentStore, PipelineOutcome, THUMBNAIL_CONTENT_TYPE, THUMBNAIL_PREFIX, VIDEO_CONTENT_TYPE,
    VIDEO_PREFIX,
};
use doorcam_logging::{redact_sensitive_data, EventLogger, PipelineEvent};
use doorcam_media::{require_source, CaptureOrchestrator, TempArtifacts, ThumbnailExtractor, ToolLocator};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::persister::RecordPersister;
use crate::probes::{StorageProbe, ADVANCED_PROBE_TIMEOUT, SOURCE_PROBE_TIMEOUT};
use crate::uploader::{ArtifactUploader, DEFAULT_STORE_TIMEOUT};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Live source address. `None` fails runs with a configuration error.
    pub source_url: Option<String>,
    /// Where clips and thumbnails live until uploaded.
    pub temp_dir: PathBuf,
    /// Bound on each blob/document store call.
    pub store_timeout: Duration,
    /// Run the storage probe before capturing.
    pub storage_preflight: bool,
    /// Concurrent run limit; `None` is unbounded.
    pub max_concurrent_captures: Option<usize>,
    pub probe_timeout: Duration,
    pub advanced_probe_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            source_url: None,
            temp_dir: std::env::temp_dir(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            storage_preflight: false,
            max_concurrent_captures: None,
            probe_timeout: SOURCE_PROBE_TIMEOUT,
            advanced_probe_timeout: ADVANCED_PROBE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Locate,
    Preflight,
    Capture,
    Thumbnail,
    UploadVideo,
    UploadThumbnail,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locate => "locate",
            Self::Preflight => "preflight",
            Self::Capture => "capture",
            Self::Thumbnail => "thumbnail",
            Self::UploadVideo => "upload_video",
            Self::UploadThumbnail => "upload_thumbnail",
            Self::Persist => "persist",
        }
    }
}

type StageResult<T> = Result<T, (Stage, CaptureError)>;

pub struct CapturePipeline {
    settings: PipelineSettings,
    orchestrator: CaptureOrchestrator,
    blob_store: Arc<dyn BlobStore>,
    uploader: ArtifactUploader,
    persister: RecordPersister,
    storage_probe: StorageProbe,
    admission: Option<Arc<Semaphore>>,
}

impl CapturePipeline {
    pub fn new(
        settings: PipelineSettings,
        locator: ToolLocator,
        blob_store: Arc<dyn BlobStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let admission = settings
            .max_concurrent_captures
            .filter(|n| *n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));

        Self {
            orchestrator: CaptureOrchestrator::new(locator),
            uploader: ArtifactUploader::new(blob_store.clone(), settings.store_timeout),
            persister: RecordPersister::new(documents, settings.store_timeout),
            storage_probe: StorageProbe::new(blob_store.clone(), settings.store_timeout),
            blob_store,
            admission,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn persister(&self) -> &RecordPersister {
        &self.persister
    }

    /// Validate raw input, then run. Out-of-range durations never reach the tool.
    pub async fn run(
        &self,
        status: AccessStatus,
        duration_seconds: i64,
    ) -> Result<PipelineOutcome, CaptureError> {
        let duration = CaptureDuration::new(duration_seconds)?;
        self.run_request(CaptureRequest { status, duration }).await
    }

    pub async fn run_request(&self, request: CaptureRequest) -> Result<PipelineOutcome, CaptureError> {
        let _permit = match &self.admission {
            Some(semaphore) => Some(
                semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| CaptureError::Configuration("capture admission is closed".into()))?,
            ),
            None => None,
        };

        let source = require_source(self.settings.source_url.as_deref()).inspect_err(|e| {
            warn!(error = %e, "Capture rejected");
        })?;

        let storage = self.blob_store.status();
        if !storage.configured {
            let err = CaptureError::StorageUnconfigured(storage.missing.join(", "));
            warn!(error = %err, "Capture rejected");
            return Err(err);
        }

        let artifacts = TempArtifacts::allocate(&self.settings.temp_dir);
        let run_id = artifacts.run_id().to_string();
        EventLogger::log_event(
            &run_id,
            PipelineEvent::RunStarted {
                status: request.status.to_string(),
                duration_secs: request.duration.seconds(),
                source: source.to_string(),
            },
        );

        let result = self.execute(&run_id, &artifacts, source, request).await;
        artifacts.cleanup().await;

        match result {
            Ok(outcome) => {
                EventLogger::log_event(
                    &run_id,
                    PipelineEvent::RunCompleted {
                        record_id: outcome.id.clone(),
                        video_url: outcome.video_url.clone(),
                        thumbnail_url: outcome.thumbnail_url.clone(),
                    },
                );
                info!(run_id = %run_id, record_id = %outcome.id, "Capture pipeline completed");
                Ok(outcome)
            }
            Err((stage, err)) => {
                error!(
                    run_id = %run_id,
                    stage = stage.as_str(),
                    kind = err.kind(),
                    error = %redact_sensitive_data(&err.to_string()),
                    "Capture pipeline failed"
                );
                EventLogger::log_event(
                    &run_id,
                    PipelineEvent::RunFailed {
                        stage: stage.as_str().to_string(),
                        kind: err.kind().to_string(),
                        error_msg: err.public_message(),
                    },
                );
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        run_id: &str,
        artifacts: &TempArtifacts,
        source: &str,
        request: CaptureRequest,
    ) -> StageResult<PipelineOutcome> {
        let tool = timed(run_id, Stage::Locate, self.orchestrator.locator().locate()).await?;

        if self.settings.storage_preflight {
            timed(run_id, Stage::Preflight, self.storage_probe.check()).await?;
        }

        let clip = timed(
            run_id,
            Stage::Capture,
            self.orchestrator
                .capture_with(&tool, source, request.duration, artifacts.video_path()),
        )
        .await?;

        let thumbnail = timed(
            run_id,
            Stage::Thumbnail,
            ThumbnailExtractor::extract(&clip, artifacts.thumbnail_path()),
        )
        .await?;

        let video_key = format!("{VIDEO_PREFIX}/{}", artifacts.video_file_name());
        let video_url = timed(
            run_id,
            Stage::UploadVideo,
            self.uploader.upload(&clip.path, &video_key, VIDEO_CONTENT_TYPE),
        )
        .await?;

        let thumbnail_key = format!("{THUMBNAIL_PREFIX}/{}", artifacts.thumbnail_file_name());
        let thumbnail_url = timed(
            run_id,
            Stage::UploadThumbnail,
            self.uploader
                .upload(&thumbnail.path, &thumbnail_key, THUMBNAIL_CONTENT_TYPE),
        )
        .await?;

        let captured = CaptureResult {
            video_url,
            thumbnail_url,
            record_id: artifacts.run_id(),
            timestamp: artifacts.started_at(),
        };

        let (id, _) = timed(
            run_id,
            Stage::Persist,
            self.persister
                .persist(request.status, &captured.video_url, &captured.thumbnail_url),
        )
        .await?;

        Ok(PipelineOutcome::new(id, request.status, captured))
    }
}

/// Await one stage, logging its duration on success and tagging failures.
async fn timed<T, F>(run_id: &str, stage: Stage, fut: F) -> StageResult<T>
where
    F: Future<Output = Result<T, CaptureError>>,
{
    let started = Instant::now();
    let value = fut.await.map_err(|e| (stage, e))?;
    EventLogger::log_event(
        run_id,
        PipelineEvent::StageCompleted {
            stage: stage.as_str().to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        },
    );
    Ok(value)
}
