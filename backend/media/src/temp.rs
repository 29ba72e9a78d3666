//! Temp-artifact lifecycle.
//!
//! A `TempArtifacts` guard owns the clip and thumbnail paths of one pipeline
//! run. Files are removed by `cleanup()` on normal paths and by `Drop` when a
//! run is aborted. Removal failures are logged and never escalated.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use doorcam_logging::{EventLogger, PipelineEvent};
use tracing::debug;
use uuid::Uuid;

/// Extension of captured clips.
pub const VIDEO_EXTENSION: &str = "mp4";

/// Extension of extracted thumbnails.
pub const THUMBNAIL_EXTENSION: &str = "jpg";

#[derive(Debug)]
pub struct TempArtifacts {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    video: PathBuf,
    thumbnail: PathBuf,
    released: bool,
}

impl TempArtifacts {
    /// Reserve unique clip and thumbnail paths in `dir`. Nothing is created on disk.
    pub fn allocate(dir: &Path) -> Self {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let stamp = file_stamp(&started_at);

        Self {
            run_id,
            started_at,
            video: dir.join(format!("record_{stamp}_{run_id}.{VIDEO_EXTENSION}")),
            thumbnail: dir.join(format!("thumbnail_{stamp}_{run_id}.{THUMBNAIL_EXTENSION}")),
            released: false,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn video_path(&self) -> &Path {
        &self.video
    }

    pub fn thumbnail_path(&self) -> &Path {
        &self.thumbnail
    }

    pub fn video_file_name(&self) -> String {
        file_name(&self.video)
    }

    pub fn thumbnail_file_name(&self) -> String {
        file_name(&self.thumbnail)
    }

    /// Remove both files. Idempotent; absent files are fine.
    pub async fn cleanup(mut self) {
        for path in [&self.video, &self.thumbnail] {
            log_removal(self.run_id, path, tokio::fs::remove_file(path).await);
        }
        self.released = true;
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        for path in [&self.video, &self.thumbnail] {
            log_removal(self.run_id, path, std::fs::remove_file(path));
        }
    }
}

fn log_removal(run_id: Uuid, path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => debug!(%run_id, path = %path.display(), "Removed temp artifact"),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(%run_id, path = %path.display(), "Temp artifact already absent")
        }
        Err(e) => EventLogger::log_event(
            &run_id.to_string(),
            PipelineEvent::CleanupFailed {
                path: path.display().to_string(),
                error_msg: e.to_string(),
            },
        ),
    }
}

/// ISO-8601 timestamp with `:` and `.` replaced so it is filename-safe.
fn file_stamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
