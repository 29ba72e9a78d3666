//! Thumbnail extraction.
//!
//! Invokes the capture tool on the local clip (`-i <clip> -ss 00:00:01
//! -vframes 1 -q:v 2 <out>`) and writes a single JPEG frame.

use std::path::{Path, PathBuf};

use doorcam_core::CaptureError;
use doorcam_logging::redact_sensitive_data;
use tracing::{error, info};

use crate::capture::LocalClip;
use crate::process::run_tool;

/// Offset into the clip where the frame is taken.
pub const THUMBNAIL_OFFSET: &str = "00:00:01";

/// JPEG quality scale passed to the encoder (2 is near-lossless).
pub const THUMBNAIL_QUALITY: u8 = 2;

/// A still frame written to the local temp directory.
#[derive(Debug, Clone)]
pub struct LocalThumbnail {
    pub path: PathBuf,
}

pub struct ThumbnailExtractor;

impl ThumbnailExtractor {
    /// Extract one frame from `clip` into `output`.
    pub async fn extract(clip: &LocalClip, output: &Path) -> Result<LocalThumbnail, CaptureError> {
        if !tokio::fs::try_exists(&clip.path).await.unwrap_or(false) {
            return Err(CaptureError::ArtifactMissing(clip.path.clone()));
        }

        info!("Extracting thumbnail from {} to {}", clip.path.display(), output.display());

        let args = thumbnail_args(&clip.path, output);
        let result = run_tool(&clip.tool, &args, None, "thumbnail").await?;

        if !result.success {
            error!(
                code = ?result.exit_code,
                diagnostics = %redact_sensitive_data(&result.diagnostics),
                "Thumbnail extraction failed"
            );
        }
        result.ensure_success()?;

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(CaptureError::ArtifactMissing(output.to_path_buf()));
        }

        Ok(LocalThumbnail {
            path: output.to_path_buf(),
        })
    }
}

pub fn thumbnail_args(clip: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        clip.to_string_lossy().into_owned(),
        "-ss".to_string(),
        THUMBNAIL_OFFSET.to_string(),
        "-vframes".to_string(),
        "1".to_string(),
        "-q:v".to_string(),
        THUMBNAIL_QUALITY.to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorcam_core::{CaptureDuration, ToolHandle, ToolMethod};

    #[test]
    fn args_take_one_frame_at_offset() {
        let args = thumbnail_args(Path::new("/tmp/a.mp4"), Path::new("/tmp/a.jpg"));
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "00:00:01");
        let frames = args.iter().position(|a| a == "-vframes").unwrap();
        assert_eq!(args[frames + 1], "1");
        assert_eq!(args.last().map(String::as_str), Some("/tmp/a.jpg"));
    }

    #[tokio::test]
    async fn missing_clip_is_rejected_before_spawning() {
        let clip = LocalClip {
            path: PathBuf::from("/no/such/clip.mp4"),
            tool: ToolHandle {
                path: PathBuf::from("/no/such/ffmpeg"),
                method: ToolMethod::Configured,
            },
            duration: CaptureDuration::default(),
        };
        let err = ThumbnailExtractor::extract(&clip, Path::new("/tmp/x.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::ArtifactMissing(_)));
    }
}
