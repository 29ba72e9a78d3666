//! CLI Doctor Command
//!
//! Checks the capture tool, the live source, blob storage and the record
//! database, and prints what to fix.

use anyhow::Result;
use doorcam_capture::CaptureService;
use doorcam_core::{DocumentStore, ACCESS_RECORDS};
use doorcam_logging::redact_sensitive_data;
use doorcam_storage::SqliteDocumentStore;

use crate::config::Config;
use crate::terminal_output::{detail, heading, note_error, note_success, note_warn};

/// Executes the full doctor diagnosis. Returns whether every required check passed.
pub async fn run(service: &CaptureService, config: &Config) -> Result<bool> {
    heading("Running DoorCam Doctor");

    let tool_ok = check_tool(service).await;
    let source_ok = check_source(service).await;
    let storage_ok = check_storage(service).await;
    let database_ok = check_database(&config.db_path).await;

    let is_ok = tool_ok && source_ok && storage_ok && database_ok;
    println!();
    if is_ok {
        note_success("All checks passed! DoorCam is ready to record.");
    } else {
        note_error("Some checks failed! Please fix the errors above.");
    }
    Ok(is_ok)
}

async fn check_tool(service: &CaptureService) -> bool {
    heading("Capture tool");
    let status = service.tool_status().await;
    match (&status.path, &status.error) {
        (Some(path), _) => {
            note_success(&format!("ffmpeg found at {}", path.display()));
            if let Some(version) = &status.version {
                detail("version", version);
            }
            true
        }
        (None, error) => {
            note_error(error.as_deref().unwrap_or("ffmpeg is not available"));
            false
        }
    }
}

async fn check_source(service: &CaptureService) -> bool {
    heading("Live source");
    let result = service.test_stream().await;
    if let Some(url) = result.detail.get("url").and_then(|u| u.as_str()) {
        if !url.is_empty() {
            detail("url", url);
        }
    }

    if !result.success {
        note_error(&redact_sensitive_data(result.error.as_deref().unwrap_or("unreachable")));
        return false;
    }

    note_success("Stream is reachable");
    if result.detail["advanced"]["success"] == true {
        detail("ffmpeg", "video stream decoded");
    } else {
        note_warn("ffmpeg could not confirm a video stream (advisory)");
    }
    true
}

async fn check_storage(service: &CaptureService) -> bool {
    heading("Blob storage");
    let result = service.probe_storage().await;
    if let Some(backend) = result.detail.get("backend").and_then(|b| b.as_str()) {
        detail("backend", backend);
    }

    if result.success {
        note_success("Test object written");
        if let Some(url) = result.detail.get("url").and_then(|u| u.as_str()) {
            detail("url", url);
        }
        true
    } else {
        note_error(result.error.as_deref().unwrap_or("storage probe failed"));
        false
    }
}

async fn check_database(db_path: &str) -> bool {
    heading("Record database");
    detail("path", db_path);

    let store = match SqliteDocumentStore::open(db_path) {
        Ok(store) => store,
        Err(e) => {
            note_error(&format!("Cannot open database: {e:#}"));
            return false;
        }
    };
    match store.list_recent(ACCESS_RECORDS, 1).await {
        Ok(latest) => {
            note_success("Database opened and queried");
            if let Some((id, _)) = latest.first() {
                detail("latest record", id);
            }
            true
        }
        Err(e) => {
            note_error(&format!("Database query failed: {e:#}"));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn database_check_opens_and_queries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        assert!(check_database(path.to_str().unwrap()).await);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn database_check_fails_on_unusable_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!check_database(dir.path().to_str().unwrap()).await);
    }
}
