#![cfg(unix)]

#[path = "common/fake_tools.rs"]
mod fake_tools;

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use doorcam_core::{CaptureDuration, CaptureError, ToolHandle, ToolMethod};
use doorcam_media::{
    run_tool, tool_version, CaptureOrchestrator, TempArtifacts, ThumbnailExtractor, ToolLocator,
};
use fake_tools::fake_tool;

fn orchestrator(name: &str) -> CaptureOrchestrator {
    CaptureOrchestrator::new(ToolLocator::default().with_override(fake_tool(name)))
}

fn duration() -> CaptureDuration {
    CaptureDuration::new(2).unwrap()
}

#[tokio::test]
async fn capture_and_thumbnail_produce_files() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = TempArtifacts::allocate(dir.path());

    let clip = orchestrator("ok")
        .capture(Some("http://cam.local/stream"), duration(), artifacts.video_path())
        .await
        .unwrap();
    assert_eq!(clip.path, artifacts.video_path());
    assert_eq!(clip.tool.method, ToolMethod::Configured);

    let thumb = ThumbnailExtractor::extract(&clip, artifacts.thumbnail_path())
        .await
        .unwrap();
    assert!(thumb.path.exists());

    artifacts.cleanup().await;
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn failing_capture_surfaces_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = TempArtifacts::allocate(dir.path());

    let err = orchestrator("capture-fail")
        .capture(Some("http://cam.local/stream"), duration(), artifacts.video_path())
        .await
        .unwrap_err();

    match err {
        CaptureError::ProcessFailed {
            exit_code,
            diagnostics,
        } => {
            assert_eq!(exit_code, Some(1));
            assert!(diagnostics.contains("Invalid data found"));
        }
        other => panic!("expected ProcessFailed, got {other:?}"),
    }

    // The partial clip is removed with the rest of the run's files.
    assert!(artifacts.video_path().exists());
    artifacts.cleanup().await;
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn clean_exit_without_output_is_artifact_missing() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = TempArtifacts::allocate(dir.path());

    let err = orchestrator("silent")
        .capture(Some("http://cam.local/stream"), duration(), artifacts.video_path())
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::ArtifactMissing(_)));
}

#[tokio::test]
async fn thumbnail_failure_keeps_clip_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = TempArtifacts::allocate(dir.path());

    let clip = orchestrator("thumb-fail")
        .capture(Some("http://cam.local/stream"), duration(), artifacts.video_path())
        .await
        .unwrap();

    let err = ThumbnailExtractor::extract(&clip, artifacts.thumbnail_path())
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::ProcessFailed { .. }));
    assert_eq!(std::fs::read(&clip.path).unwrap(), b"clip");

    // The partial frame goes with the rest of the run's files.
    artifacts.cleanup().await;
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn thumbnail_failure_log_hides_stream_credentials() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempfile::tempdir().unwrap();
    let artifacts = TempArtifacts::allocate(dir.path());
    let clip = orchestrator("thumb-fail")
        .capture(Some("http://cam.local/stream"), duration(), artifacts.video_path())
        .await
        .unwrap();
    ThumbnailExtractor::extract(&clip, artifacts.thumbnail_path())
        .await
        .unwrap_err();
    artifacts.cleanup().await;

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("Thumbnail extraction failed"));
    assert!(output.contains("rtsp://[REDACTED]@cam.local/live"));
    assert!(!output.contains("hunter2"));
}

#[tokio::test]
async fn missing_tool_creates_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = TempArtifacts::allocate(dir.path());

    let err = CaptureOrchestrator::new(ToolLocator::default().with_override(dir.path().join("nope")))
        .capture(Some("http://cam.local/stream"), duration(), artifacts.video_path())
        .await
        .unwrap_err();

    assert!(matches!(err, CaptureError::ToolUnavailable { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn deadline_kills_slow_tool() {
    let handle = ToolHandle {
        path: fake_tool("slow"),
        method: ToolMethod::Configured,
    };
    let started = Instant::now();
    let out = run_tool(&handle, &[], Some(Duration::from_millis(300)), "test")
        .await
        .unwrap();

    assert!(out.timed_out);
    assert!(!out.success);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn version_is_read_from_tool() {
    let handle = ToolHandle {
        path: fake_tool("ok"),
        method: ToolMethod::Configured,
    };
    assert_eq!(tool_version(&handle).await.as_deref(), Some("6.1-test"));

    let status = ToolLocator::default()
        .with_override(fake_tool("ok"))
        .status()
        .await;
    assert!(status.available);
    assert_eq!(status.version.as_deref(), Some("6.1-test"));
}
