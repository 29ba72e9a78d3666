//! Core types, error taxonomy, and storage traits for the DoorCam capture pipeline.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{diagnostics_tail, CaptureError};
pub use traits::{BlobStore, DocumentStore};
pub use types::{
    AccessRecord, AccessRecordFields, AccessStatus, BlobHandle, BlobStoreStatus, CaptureDuration,
    CaptureRequest, CaptureResult, PipelineOutcome, ProbeResult, ToolHandle, ToolMethod,
    ACCESS_RECORDS, THUMBNAIL_CONTENT_TYPE, THUMBNAIL_PREFIX, VIDEO_CONTENT_TYPE, VIDEO_PREFIX,
};
