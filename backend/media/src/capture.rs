//! Clip capture from the live source.

use std::path::{Path, PathBuf};
use std::time::Instant;

use doorcam_core::{CaptureDuration, CaptureError, ToolHandle};
use doorcam_logging::redact_sensitive_data;
use tracing::{error, info};

use crate::process::run_tool;
use crate::tool::ToolLocator;

/// Encoder settings for captured clips. Tuned for playback compatibility
/// in browsers rather than for latency.
#[derive(Debug, Clone)]
pub struct EncodingProfile {
    pub codec: String,
    pub preset: String,
    pub crf: u8,
    pub faststart: bool,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 23,
            faststart: true,
        }
    }
}

/// A clip written to the local temp directory.
#[derive(Debug, Clone)]
pub struct LocalClip {
    pub path: PathBuf,
    pub tool: ToolHandle,
    pub duration: CaptureDuration,
}

/// Records fixed-duration clips by driving the capture tool.
#[derive(Debug, Clone, Default)]
pub struct CaptureOrchestrator {
    locator: ToolLocator,
    profile: EncodingProfile,
}

impl CaptureOrchestrator {
    pub fn new(locator: ToolLocator) -> Self {
        Self {
            locator,
            profile: EncodingProfile::default(),
        }
    }

    pub fn with_profile(mut self, profile: EncodingProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn locator(&self) -> &ToolLocator {
        &self.locator
    }

    /// Check the source address, resolve the tool, and record into `output`.
    pub async fn capture(
        &self,
        source_url: Option<&str>,
        duration: CaptureDuration,
        output: &Path,
    ) -> Result<LocalClip, CaptureError> {
        let source = require_source(source_url)?;
        let tool = self.locator.locate().await?;
        self.capture_with(&tool, source, duration, output).await
    }

    /// Record with an already-resolved tool.
    pub async fn capture_with(
        &self,
        tool: &ToolHandle,
        source: &str,
        duration: CaptureDuration,
        output: &Path,
    ) -> Result<LocalClip, CaptureError> {
        info!(
            source = %redact_sensitive_data(source),
            duration_secs = duration.seconds(),
            output = %output.display(),
            "Starting clip capture"
        );
        let started = Instant::now();

        let args = capture_args(source, duration, output, &self.profile);
        let result = run_tool(tool, &args, None, "capture").await?;

        if !result.success {
            error!(
                code = ?result.exit_code,
                diagnostics = %redact_sensitive_data(&result.diagnostics),
                "Clip capture failed"
            );
        }
        result.ensure_success()?;

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            error!(output = %output.display(), "Capture tool exited cleanly but wrote no clip");
            return Err(CaptureError::ArtifactMissing(output.to_path_buf()));
        }

        info!(
            output = %output.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Clip captured"
        );

        Ok(LocalClip {
            path: output.to_path_buf(),
            tool: tool.clone(),
            duration,
        })
    }
}

/// The configured source address, or `Configuration` when absent or blank.
pub fn require_source(source_url: Option<&str>) -> Result<&str, CaptureError> {
    source_url
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CaptureError::Configuration("live stream source URL is not configured".into()))
}

/// Arguments for one capture: overwrite, read the source, stop after `duration`.
pub fn capture_args(
    source: &str,
    duration: CaptureDuration,
    output: &Path,
    profile: &EncodingProfile,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        source.to_string(),
        "-t".to_string(),
        duration.seconds().to_string(),
        "-c:v".to_string(),
        profile.codec.clone(),
        "-preset".to_string(),
        profile.preset.clone(),
        "-crf".to_string(),
        profile.crf.to_string(),
    ];
    if profile.faststart {
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
    }
    args.push(output.to_string_lossy().into_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_overwrite_and_bound_duration() {
        let duration = CaptureDuration::new(15).unwrap();
        let args = capture_args(
            "http://cam.local/video",
            duration,
            Path::new("/tmp/record.mp4"),
            &EncodingProfile::default(),
        );

        assert_eq!(args.first().map(String::as_str), Some("-y"));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "15");
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "http://cam.local/video");
        assert!(args.contains(&"+faststart".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/record.mp4"));
    }

    #[test]
    fn blank_source_is_configuration_error() {
        assert!(matches!(require_source(None), Err(CaptureError::Configuration(_))));
        assert!(matches!(require_source(Some("  ")), Err(CaptureError::Configuration(_))));
        assert_eq!(require_source(Some(" http://x ")).unwrap(), "http://x");
    }

    #[tokio::test]
    async fn unconfigured_source_fails_before_locating_tool() {
        // The override path does not exist: reaching the locator would yield ToolUnavailable.
        let orchestrator =
            CaptureOrchestrator::new(ToolLocator::default().with_override("/no/such/ffmpeg"));
        let err = orchestrator
            .capture(None, CaptureDuration::default(), Path::new("/tmp/unused.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Configuration(_)));
    }
}
