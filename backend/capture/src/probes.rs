//! Connectivity probes for the live source and the blob store.
//!
//! Probes are side-effect light: the source probes only read, and the storage
//! probe leaves one small test object behind per call.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use doorcam_core::{BlobStore, CaptureError, ProbeResult};
use doorcam_logging::redact_sensitive_data;
use doorcam_media::{require_source, run_tool, ToolLocator};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

/// Deadline for the HTTP reachability probe.
pub const SOURCE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for the tool-driven probe; the tool is killed on expiry.
pub const ADVANCED_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const PROBE_USER_AGENT: &str = "DoorCam/1.0";

/// Diagnostic markers the capture tool prints once it has decoded a stream.
const STREAM_MARKERS: [&str; 2] = ["Stream #0", "Video:"];

/// Fixed payload written by the storage probe.
const STORAGE_PROBE_PAYLOAD: [u8; 5] = [1, 2, 3, 4, 5];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceProbeReport {
    pub status: u16,
    pub content_type: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedProbeReport {
    pub marker: String,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageProbeReport {
    pub key: String,
    pub url: String,
}

/// Probes the live source over HTTP and, optionally, through the capture tool.
pub struct SourceProbe {
    client: reqwest::Client,
    source_url: Option<String>,
    timeout: Duration,
    advanced_timeout: Duration,
    locator: ToolLocator,
}

impl SourceProbe {
    pub fn new(client: reqwest::Client, source_url: Option<String>, locator: ToolLocator) -> Self {
        Self {
            client,
            source_url,
            timeout: SOURCE_PROBE_TIMEOUT,
            advanced_timeout: ADVANCED_PROBE_TIMEOUT,
            locator,
        }
    }

    pub fn with_timeouts(mut self, timeout: Duration, advanced_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.advanced_timeout = advanced_timeout;
        self
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// GET the source and check it answers 2xx with a multipart or image payload.
    ///
    /// Only the response head is read; an MJPEG body never ends.
    pub async fn probe(&self) -> Result<SourceProbeReport, CaptureError> {
        let url = require_source(self.source_url.as_deref())?;
        debug!(url = %redact_sensitive_data(url), "Probing live source");
        let started = std::time::Instant::now();

        let request = self
            .client
            .get(url)
            .header(USER_AGENT, PROBE_USER_AGENT)
            .send();

        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() => return Err(CaptureError::ProbeTimeout(self.timeout)),
            Ok(Err(e)) => {
                return Err(CaptureError::Probe(format!(
                    "source request failed: {}",
                    redact_sensitive_data(&e.to_string())
                )))
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Live source probe timed out");
                return Err(CaptureError::ProbeTimeout(self.timeout));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::Probe(format!("source answered HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_stream_content_type(&content_type) {
            return Err(CaptureError::Probe(format!(
                "unexpected content type {content_type:?} (expected multipart or image)"
            )));
        }

        let report = SourceProbeReport {
            status: status.as_u16(),
            content_type,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(status = report.status, content_type = %report.content_type, "Live source reachable");
        Ok(report)
    }

    /// Read one second of the source with the capture tool and look for a
    /// decoded video stream in its diagnostics.
    pub async fn probe_advanced(&self) -> Result<AdvancedProbeReport, CaptureError> {
        let url = require_source(self.source_url.as_deref())?;
        let tool = self.locator.locate().await?;

        let args: Vec<String> = ["-i", url, "-t", "1", "-f", "null", "-"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let output = run_tool(&tool, &args, Some(self.advanced_timeout), "probe").await?;

        if output.timed_out {
            return Err(CaptureError::ProbeTimeout(self.advanced_timeout));
        }

        let combined = format!("{}\n{}", output.diagnostics, output.stdout);
        match STREAM_MARKERS.iter().find(|m| combined.contains(*m)) {
            Some(marker) => Ok(AdvancedProbeReport {
                marker: marker.to_string(),
                exit_code: output.exit_code,
            }),
            None => Err(CaptureError::Probe(format!(
                "no video stream found in source: {}",
                doorcam_core::diagnostics_tail(&output.diagnostics, 3)
            ))),
        }
    }

    /// The simple probe, plus the advanced probe as advisory detail.
    ///
    /// Only the simple probe decides `success`.
    pub async fn test_stream(&self) -> ProbeResult {
        let url = self
            .source_url
            .as_deref()
            .map(redact_sensitive_data)
            .unwrap_or_default();

        let simple = match self.probe().await {
            Ok(report) => report,
            Err(e) => return ProbeResult::failed(json!({ "url": url }), &e),
        };

        let advanced = match self.probe_advanced().await {
            Ok(report) => json!({ "success": true, "marker": report.marker }),
            Err(e) => {
                debug!(error = %e, "Advisory tool probe failed");
                json!({ "success": false, "error": e.public_message() })
            }
        };

        ProbeResult::ok(json!({
            "url": url,
            "status": simple.status,
            "contentType": simple.content_type,
            "elapsedMs": simple.elapsed_ms,
            "advanced": advanced,
        }))
    }
}

fn is_stream_content_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("multipart") || lower.contains("image")
}

/// Writes a small test object to the blob store and resolves its URL.
pub struct StorageProbe {
    store: Arc<dyn BlobStore>,
    timeout: Duration,
}

impl StorageProbe {
    /// `timeout` bounds the write and the URL resolution separately.
    pub fn new(store: Arc<dyn BlobStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Fails with `StorageUnconfigured` or `StorageWrite`.
    pub async fn check(&self) -> Result<StorageProbeReport, CaptureError> {
        let status = self.store.status();
        if !status.configured {
            return Err(CaptureError::StorageUnconfigured(status.missing.join(", ")));
        }

        let key = format!("test/connection-test-{}.bin", Utc::now().timestamp_millis());
        let write = self
            .store
            .write(&key, STORAGE_PROBE_PAYLOAD.to_vec(), "application/octet-stream");
        let handle = match tokio::time::timeout(self.timeout, write).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => return Err(CaptureError::StorageWrite(format!("{e:#}"))),
            Err(_) => return Err(self.expired("test write")),
        };

        let url = match tokio::time::timeout(self.timeout, self.store.resolve_url(&handle)).await {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => return Err(CaptureError::StorageWrite(format!("{e:#}"))),
            Err(_) => return Err(self.expired("URL resolution")),
        };

        info!(key = %key, "Storage probe object written");
        Ok(StorageProbeReport { key, url })
    }

    fn expired(&self, what: &str) -> CaptureError {
        warn!(
            backend = self.store.name(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Storage {what} timed out"
        );
        CaptureError::StorageWrite(format!(
            "{what} timed out after {}ms",
            self.timeout.as_millis()
        ))
    }

    /// Reporting form of [`StorageProbe::check`]; never an error.
    pub async fn probe(&self) -> ProbeResult {
        let status = self.store.status();
        match self.check().await {
            Ok(report) => ProbeResult::ok(json!({
                "backend": status.backend,
                "location": status.location,
                "key": report.key,
                "url": report.url,
            })),
            Err(e) => {
                warn!(error = %e, "Storage probe failed");
                ProbeResult::failed(
                    json!({
                        "backend": status.backend,
                        "configured": status.configured,
                        "missing": status.missing,
                    }),
                    &e,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_content_types() {
        assert!(is_stream_content_type("multipart/x-mixed-replace; boundary=frame"));
        assert!(is_stream_content_type("image/jpeg"));
        assert!(!is_stream_content_type("text/html"));
        assert!(!is_stream_content_type(""));
    }

    #[tokio::test]
    async fn unconfigured_source_is_configuration_error() {
        let probe = SourceProbe::new(reqwest::Client::new(), None, ToolLocator::default());
        assert!(matches!(probe.probe().await, Err(CaptureError::Configuration(_))));
        let result = probe.test_stream().await;
        assert!(!result.success);
    }
}
