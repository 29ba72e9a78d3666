//! Capture-and-persist pipeline: probes, artifact upload, record persistence,
//! and the service surface the HTTP API and CLI call into.

pub mod persister;
pub mod pipeline;
pub mod probes;
pub mod service;
pub mod uploader;

pub use persister::RecordPersister;
pub use pipeline::{CapturePipeline, PipelineSettings, Stage};
pub use probes::{
    AdvancedProbeReport, SourceProbe, SourceProbeReport, StorageProbe, StorageProbeReport,
    ADVANCED_PROBE_TIMEOUT, SOURCE_PROBE_TIMEOUT,
};
pub use service::{
    CaptureService, EnvironmentInfo, SourceStatus, SystemStatus, MAX_RECENT_RECORDS,
};
pub use uploader::{ArtifactUploader, DEFAULT_STORE_TIMEOUT};
