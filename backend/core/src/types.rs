use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CaptureError;

/// Document-store collection holding access records.
pub const ACCESS_RECORDS: &str = "access_records";

/// Content type used for captured clips.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Content type used for extracted thumbnails.
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

/// Blob key prefix for clips.
pub const VIDEO_PREFIX: &str = "videos";

/// Blob key prefix for thumbnails.
pub const THUMBNAIL_PREFIX: &str = "thumbnails";

/// Direction of a physical access event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Entry,
    Exit,
    #[default]
    Unknown,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessStatus {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(Self::Entry),
            "exit" => Ok(Self::Exit),
            "unknown" => Ok(Self::Unknown),
            other => Err(CaptureError::InvalidStatus(other.to_string())),
        }
    }
}

/// Clip length in whole seconds, always within `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CaptureDuration(u32);

impl CaptureDuration {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 60;
    pub const DEFAULT: Self = Self(15);

    pub fn new(seconds: i64) -> Result<Self, CaptureError> {
        if seconds < Self::MIN as i64 || seconds > Self::MAX as i64 {
            return Err(CaptureError::InvalidDuration(seconds));
        }
        Ok(Self(seconds as u32))
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }
}

impl Default for CaptureDuration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Transient input to a pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureRequest {
    pub status: AccessStatus,
    pub duration: CaptureDuration,
}

impl CaptureRequest {
    /// Validate raw caller input. `None` fields take their defaults.
    pub fn parse(status: Option<&str>, duration_seconds: Option<i64>) -> Result<Self, CaptureError> {
        let status = match status {
            Some(s) => s.parse()?,
            None => AccessStatus::default(),
        };
        let duration = match duration_seconds {
            Some(seconds) => CaptureDuration::new(seconds)?,
            None => CaptureDuration::default(),
        };
        Ok(Self { status, duration })
    }
}

/// Artifacts produced by one successful capture. `record_id` is the run's
/// own identifier (it names the artifacts), not the document-store id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub video_url: String,
    pub thumbnail_url: String,
    pub record_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Stored fields of an access record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecordFields {
    pub time: DateTime<Utc>,
    pub status: AccessStatus,
    pub photo: String,
    pub video_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessRecordFields {
    /// A fresh record stamped with the current time.
    pub fn new(status: AccessStatus, photo: impl Into<String>, video_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            time: now,
            status,
            photo: photo.into(),
            video_url: video_url.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// An access record as read back from the document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: AccessRecordFields,
}

/// What the caller of a pipeline run receives: the stored record id plus
/// the run's capture result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub id: String,
    pub run_id: Uuid,
    pub video_url: String,
    pub thumbnail_url: String,
    pub timestamp: DateTime<Utc>,
    pub status: AccessStatus,
}

impl PipelineOutcome {
    pub fn new(id: String, status: AccessStatus, captured: CaptureResult) -> Self {
        Self {
            id,
            run_id: captured.record_id,
            video_url: captured.video_url,
            thumbnail_url: captured.thumbnail_url,
            timestamp: captured.timestamp,
            status,
        }
    }
}

/// How the capture tool path was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolMethod {
    /// Found through the host's executable search.
    System,
    /// Taken from an explicit path override.
    Configured,
}

/// A usable invocation path for the capture tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolHandle {
    pub path: PathBuf,
    pub method: ToolMethod,
}

/// Outcome of a health probe, reported rather than raised.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub success: bool,
    pub detail: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn ok(detail: serde_json::Value) -> Self {
        Self {
            success: true,
            detail,
            error: None,
        }
    }

    pub fn failed(detail: serde_json::Value, error: &CaptureError) -> Self {
        Self {
            success: false,
            detail,
            error: Some(error.to_string()),
        }
    }
}

/// Reference to a written blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

/// Configuration summary of a blob store, used for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BlobStoreStatus {
    pub backend: String,
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_bounds() {
        assert!(CaptureDuration::new(0).is_err());
        assert!(CaptureDuration::new(61).is_err());
        assert!(CaptureDuration::new(-5).is_err());
        assert_eq!(CaptureDuration::new(1).unwrap().seconds(), 1);
        assert_eq!(CaptureDuration::new(60).unwrap().seconds(), 60);
        assert_eq!(CaptureDuration::default().seconds(), 15);
    }

    #[test]
    fn status_parsing() {
        assert_eq!("entry".parse::<AccessStatus>().unwrap(), AccessStatus::Entry);
        assert_eq!("exit".parse::<AccessStatus>().unwrap(), AccessStatus::Exit);
        assert!(matches!(
            "ENTRY".parse::<AccessStatus>(),
            Err(CaptureError::InvalidStatus(_))
        ));
    }

    #[test]
    fn request_defaults() {
        let req = CaptureRequest::parse(None, None).unwrap();
        assert_eq!(req.status, AccessStatus::Unknown);
        assert_eq!(req.duration.seconds(), 15);

        let err = CaptureRequest::parse(Some("entry"), Some(120)).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidDuration(120)));
    }

    #[test]
    fn record_serializes_flat_camel_case() {
        let record = AccessRecord {
            id: "abc".into(),
            fields: AccessRecordFields::new(AccessStatus::Entry, "http://x/t.jpg", "http://x/v.mp4"),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["status"], "entry");
        assert_eq!(value["photo"], "http://x/t.jpg");
        assert_eq!(value["videoUrl"], "http://x/v.mp4");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("fields").is_none());

        let back: AccessRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn new_record_timestamps_agree() {
        let fields = AccessRecordFields::new(AccessStatus::Exit, "p", "v");
        assert_eq!(fields.time, fields.created_at);
        assert_eq!(fields.created_at, fields.updated_at);
    }
}
