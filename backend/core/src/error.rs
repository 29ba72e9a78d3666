use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Number of trailing diagnostic lines kept in caller-facing messages.
const PUBLIC_DIAGNOSTIC_LINES: usize = 6;

/// Error taxonomy for the capture-and-persist pipeline and its probes.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid capture duration {0}s: must be between 1 and 60 seconds")]
    InvalidDuration(i64),

    #[error("invalid access status {0:?}: must be one of entry, exit, unknown")]
    InvalidStatus(String),

    #[error("capture tool unavailable: {reason}. {hint}")]
    ToolUnavailable { reason: String, hint: String },

    #[error("capture tool exited with {}: {diagnostics}", describe_exit(.exit_code))]
    ProcessFailed {
        exit_code: Option<i32>,
        diagnostics: String,
    },

    #[error("capture tool reported success but produced no file at {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("probe timed out after {}s", .0.as_secs_f32())]
    ProbeTimeout(Duration),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("storage is not configured: missing {0}")]
    StorageUnconfigured(String),

    #[error("storage write failed: {0}")]
    StorageWrite(String),

    #[error("upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("record persistence failed: {0}")]
    Persistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl CaptureError {
    /// Stable discriminator used in API envelopes and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::InvalidDuration(_) | Self::InvalidStatus(_) => "invalid_request",
            Self::ToolUnavailable { .. } => "tool_unavailable",
            Self::ProcessFailed { .. } => "process_failed",
            Self::ArtifactMissing(_) => "artifact_missing",
            Self::ProbeTimeout(_) => "probe_timeout",
            Self::Probe(_) => "probe_failed",
            Self::StorageUnconfigured(_) => "storage_unconfigured",
            Self::StorageWrite(_) => "storage_write_error",
            Self::Upload { .. } => "upload_error",
            Self::Persistence(_) => "persistence_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Request-validation failures, rejected before any work starts.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidDuration(_) | Self::InvalidStatus(_))
    }

    /// Missing source address or storage credentials.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::StorageUnconfigured(_))
    }

    /// Message suitable for untrusted callers: tool diagnostics are cut down to
    /// their last few lines. Full detail is logged where the error is raised.
    pub fn public_message(&self) -> String {
        match self {
            Self::ProcessFailed {
                exit_code,
                diagnostics,
            } => format!(
                "capture tool exited with {}: {}",
                describe_exit(exit_code),
                diagnostics_tail(diagnostics, PUBLIC_DIAGNOSTIC_LINES)
            ),
            other => other.to_string(),
        }
    }
}

/// Last `lines` non-empty lines of a diagnostic stream, joined with `" | "`.
pub fn diagnostics_tail(diagnostics: &str, lines: usize) -> String {
    let kept: Vec<&str> = diagnostics
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = kept.len().saturating_sub(lines);
    kept[start..].join(" | ")
}
