//! Pipeline Event Logger
//!
//! Lifecycle events of capture runs, emitted as structured entries under the
//! `pipeline_events` target so the JSON file layer keeps them as NDJSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        status: String,
        duration_secs: u32,
        source: String,
    },
    StageCompleted {
        stage: String,
        elapsed_ms: u64,
    },
    RunCompleted {
        record_id: String,
        video_url: String,
        thumbnail_url: String,
    },
    RunFailed {
        stage: String,
        kind: String,
        error_msg: String,
    },
    CleanupFailed {
        path: String,
        error_msg: String,
    },
}

impl PipelineEvent {
    fn is_failure(&self) -> bool {
        matches!(self, Self::RunFailed { .. } | Self::CleanupFailed { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: PipelineEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Redacts the event's free-text fields and writes it to the tracing system.
    pub fn log_event(run_id: &str, event: PipelineEvent) {
        let entry = Self::entry(run_id, event);
        let payload = serde_json::to_string(&entry).unwrap_or_default();

        if entry.event.is_failure() {
            warn!(target: "pipeline_events", run_id = %entry.run_id, event = %payload, "Pipeline event");
        } else {
            info!(target: "pipeline_events", run_id = %entry.run_id, event = %payload, "Pipeline event");
        }
    }

    fn entry(run_id: &str, mut event: PipelineEvent) -> EventLogEntry {
        match &mut event {
            PipelineEvent::RunStarted { source, .. } => {
                *source = redact_sensitive_data(source);
            }
            PipelineEvent::RunFailed { error_msg, .. } | PipelineEvent::CleanupFailed { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            PipelineEvent::RunCompleted {
                video_url,
                thumbnail_url,
                ..
            } => {
                *video_url = redact_sensitive_data(video_url);
                *thumbnail_url = redact_sensitive_data(thumbnail_url);
            }
            PipelineEvent::StageCompleted { .. } => {}
        }

        EventLogEntry {
            run_id: run_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}
