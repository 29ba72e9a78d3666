use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use doorcam_capture::PipelineSettings;
use doorcam_media::{ToolLocator, DEFAULT_TOOL};
use doorcam_storage::{StorageBackend, StorageConfig};

/// DoorCam runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Log level, overridden by `RUST_LOG` filters
    pub log_level: String,
    /// Directory for the rolling JSON log; console only when unset
    pub log_dir: Option<PathBuf>,

    // Capture
    pub stream_url: Option<String>,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffmpeg_bin: String,
    pub temp_dir: PathBuf,
    pub max_concurrent_captures: Option<usize>,

    // Storage
    pub storage_backend: StorageBackend,
    pub media_dir: PathBuf,
    pub public_base_url: Option<String>,
    pub storage_endpoint: Option<String>,
    pub storage_token: Option<String>,
    pub storage_preflight: bool,
    /// SQLite database path
    pub db_path: String,

    // Timeouts
    pub store_timeout: Duration,
    pub probe_timeout: Duration,
    pub advanced_probe_timeout: Duration,
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("doorcam")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_dir: None,
            stream_url: None,
            ffmpeg_path: None,
            ffmpeg_bin: DEFAULT_TOOL.to_string(),
            temp_dir: std::env::temp_dir(),
            max_concurrent_captures: None,
            storage_backend: StorageBackend::Local,
            media_dir: data_dir().join("media"),
            public_base_url: None,
            storage_endpoint: None,
            storage_token: None,
            storage_preflight: false,
            db_path: data_dir().join("doorcam.db").to_string_lossy().into_owned(),
            store_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            advanced_probe_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let secs = |name: &str, default: Duration| {
            var(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        let defaults = Self::default();

        let storage_backend = match var("DOORCAM_STORAGE_BACKEND") {
            Some(value) => value
                .parse()
                .context("Invalid DOORCAM_STORAGE_BACKEND")?,
            None => defaults.storage_backend,
        };

        Ok(Self {
            bind_address: var("DOORCAM_BIND").unwrap_or(defaults.bind_address),
            port: var("DOORCAM_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_dir: var("DOORCAM_LOG_DIR").map(PathBuf::from),
            stream_url: var("DOORCAM_STREAM_URL").or_else(|| var("MJPEG_STREAM_URL")),
            ffmpeg_path: var("DOORCAM_FFMPEG_PATH").map(PathBuf::from),
            ffmpeg_bin: var("DOORCAM_FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            temp_dir: var("DOORCAM_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
            max_concurrent_captures: var("DOORCAM_MAX_CONCURRENT_CAPTURES")
                .and_then(|v| v.trim().parse().ok())
                .filter(|n: &usize| *n > 0),
            storage_backend,
            media_dir: var("DOORCAM_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_dir),
            public_base_url: var("DOORCAM_PUBLIC_BASE_URL"),
            storage_endpoint: var("DOORCAM_STORAGE_ENDPOINT"),
            storage_token: var("DOORCAM_STORAGE_TOKEN"),
            storage_preflight: var("DOORCAM_STORAGE_PREFLIGHT")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
            db_path: var("DOORCAM_DB").unwrap_or(defaults.db_path),
            store_timeout: secs("DOORCAM_STORE_TIMEOUT_SECS", defaults.store_timeout),
            probe_timeout: secs("DOORCAM_PROBE_TIMEOUT_SECS", defaults.probe_timeout),
            advanced_probe_timeout: secs(
                "DOORCAM_ADVANCED_PROBE_TIMEOUT_SECS",
                defaults.advanced_probe_timeout,
            ),
        })
    }

    /// Storage settings. The local backend serves its own blobs, so its public
    /// URL defaults to this server's `/media` mount.
    pub fn storage_config(&self) -> StorageConfig {
        let public_base_url = self.public_base_url.clone().or_else(|| {
            (self.storage_backend == StorageBackend::Local)
                .then(|| format!("http://localhost:{}/media", self.port))
        });

        StorageConfig {
            backend: self.storage_backend,
            media_dir: self.media_dir.clone(),
            public_base_url,
            endpoint: self.storage_endpoint.clone(),
            token: self.storage_token.clone(),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            source_url: self.stream_url.clone(),
            temp_dir: self.temp_dir.clone(),
            store_timeout: self.store_timeout,
            storage_preflight: self.storage_preflight,
            max_concurrent_captures: self.max_concurrent_captures,
            probe_timeout: self.probe_timeout,
            advanced_probe_timeout: self.advanced_probe_timeout,
        }
    }

    pub fn tool_locator(&self) -> ToolLocator {
        let locator = ToolLocator::new(&self.ffmpeg_bin);
        match &self.ffmpeg_path {
            Some(path) => locator.with_override(path),
            None => locator,
        }
    }
}
