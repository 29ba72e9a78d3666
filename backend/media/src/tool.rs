//! Capture tool locator.
//!
//! Resolves the external capture/encode binary (ffmpeg by default) through the
//! host's executable search, or through an explicit path override.

use std::path::PathBuf;

use doorcam_core::{CaptureError, ToolHandle, ToolMethod};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::process::run_tool;

/// Default capture tool binary name.
pub const DEFAULT_TOOL: &str = "ffmpeg";

static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"ffmpeg version (\S+)").unwrap());

/// Install instructions for the current platform.
pub fn install_hint() -> &'static str {
    if cfg!(target_os = "windows") {
        "Download ffmpeg from https://ffmpeg.org/download.html and add it to PATH"
    } else if cfg!(target_os = "macos") {
        "Install it with: brew install ffmpeg"
    } else {
        "Install it with: sudo apt install ffmpeg (Debian/Ubuntu) or your distribution's package manager"
    }
}

/// Host executable search program.
fn search_program() -> &'static str {
    if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    }
}

/// Tool availability report for health surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ToolMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Finds the capture tool. Cheap; every call performs a fresh lookup.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    binary: String,
    override_path: Option<PathBuf>,
}

impl Default for ToolLocator {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL)
    }
}

impl ToolLocator {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            override_path: None,
        }
    }

    /// Skip the host search and use this path instead.
    pub fn with_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Resolve the tool, or fail with an actionable `ToolUnavailable`.
    pub async fn locate(&self) -> Result<ToolHandle, CaptureError> {
        if let Some(path) = &self.override_path {
            let is_file = tokio::fs::metadata(path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            return if is_file {
                debug!(path = %path.display(), "Using configured capture tool");
                Ok(ToolHandle {
                    path: path.clone(),
                    method: ToolMethod::Configured,
                })
            } else {
                Err(self.unavailable(format!(
                    "configured path {} does not exist",
                    path.display()
                )))
            };
        }

        let output = Command::new(search_program())
            .arg(&self.binary)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.unavailable(format!("{} lookup failed: {e}", search_program())))?;

        if !output.status.success() {
            return Err(self.unavailable(format!("{} is not installed", self.binary)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = first_path(&stdout)
            .ok_or_else(|| self.unavailable(format!("{} returned no path", search_program())))?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(self.unavailable(format!(
                "resolved path {} does not exist",
                path.display()
            )));
        }

        info!(path = %path.display(), "Using system capture tool");
        Ok(ToolHandle {
            path,
            method: ToolMethod::System,
        })
    }

    /// Availability plus best-effort version, never an error.
    pub async fn status(&self) -> ToolStatus {
        match self.locate().await {
            Ok(handle) => {
                let version = tool_version(&handle).await;
                ToolStatus {
                    available: true,
                    path: Some(handle.path),
                    method: Some(handle.method),
                    version,
                    error: None,
                }
            }
            Err(e) => ToolStatus {
                available: false,
                path: None,
                method: None,
                version: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn unavailable(&self, reason: String) -> CaptureError {
        warn!(tool = %self.binary, reason = %reason, "Capture tool unavailable");
        CaptureError::ToolUnavailable {
            reason,
            hint: install_hint().to_string(),
        }
    }
}

/// First non-empty line of a locator's output.
fn first_path(output: &str) -> Option<PathBuf> {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(PathBuf::from)
}

/// Runs `<tool> -version` and extracts the version string.
pub async fn tool_version(handle: &ToolHandle) -> Option<String> {
    let args = vec!["-version".to_string()];
    match run_tool(handle, &args, None, "version").await {
        Ok(output) => parse_version(&output.stdout),
        Err(e) => {
            warn!(error = %e, "Capture tool version lookup failed");
            None
        }
    }
}

/// Extract the version from `ffmpeg -version` output.
pub fn parse_version(output: &str) -> Option<String> {
    VERSION_RE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
