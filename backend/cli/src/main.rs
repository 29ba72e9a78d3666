mod api;
mod config;
mod doctor_cmd;
mod terminal_output;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use doorcam_capture::CaptureService;
use doorcam_core::{AccessStatus, CaptureError};
use doorcam_logging::{init_logger, redact_sensitive_data};
use doorcam_storage::{build_blob_store, SqliteDocumentStore, StorageBackend};

use api::AppState;
use config::Config;
use terminal_output::{detail, note_error, note_info, note_success, note_warn};

#[derive(Parser)]
#[command(name = "doorcam")]
#[command(about = "DoorCam: on-demand access clips, thumbnails and records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Capture one clip and persist its access record
    Record {
        /// entry, exit or unknown
        #[arg(short, long, default_value = "unknown")]
        status: AccessStatus,
        /// Clip length in seconds (1-60)
        #[arg(short, long, default_value_t = 15)]
        duration: i64,
    },
    /// Check that the live source is reachable
    Probe {
        /// Also read one second of the stream with ffmpeg
        #[arg(long)]
        advanced: bool,
    },
    /// Diagnose tool, source, storage and database setup
    Doctor,
    /// Query a running server's system status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_logger(&config.log_level, config.log_dir.as_deref());

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Record { status, duration } => {
            let service = build_service(&config)?;
            run_record(&service, status, duration).await?;
        }
        Commands::Probe { advanced } => {
            let service = build_service(&config)?;
            run_probe(&service, advanced).await?;
        }
        Commands::Doctor => {
            let service = build_service(&config)?;
            if !doctor_cmd::run(&service, &config).await? {
                std::process::exit(1);
            }
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/api/system-status", config.port))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    note_warn(&format!("DoorCam is not running on port {}", config.port));
                }
            }
        }
    }

    Ok(())
}

/// Construct every collaborator once and inject them into the service.
fn build_service(config: &Config) -> Result<CaptureService> {
    let blob_store = build_blob_store(&config.storage_config())?;

    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let documents = Arc::new(SqliteDocumentStore::open(&config.db_path)?);

    let http = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    Ok(CaptureService::new(
        config.pipeline_settings(),
        config.tool_locator(),
        blob_store,
        documents,
        http,
    ))
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        db = %config.db_path,
        storage = %config.storage_backend,
        source_configured = config.stream_url.is_some(),
        "Starting DoorCam"
    );

    let service = Arc::new(build_service(&config)?);

    let media_dir = match config.storage_backend {
        StorageBackend::Local => {
            std::fs::create_dir_all(&config.media_dir)
                .with_context(|| format!("Failed to create {}", config.media_dir.display()))?;
            Some(config.media_dir.clone())
        }
        StorageBackend::Http => None,
    };

    let app = api::build_router(Arc::new(AppState { service }), media_dir)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());
    let addr = format!("{}:{}", config.bind_address, config.port);

    info!(addr = %addr, "HTTP API listening");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_record(service: &CaptureService, status: AccessStatus, duration: i64) -> Result<()> {
    note_info(&format!("Recording {duration}s clip ({status})..."));
    match service.run_capture_pipeline(status, duration).await {
        Ok(outcome) => {
            note_success("Recording saved");
            detail("record", &outcome.id);
            detail("video", &outcome.video_url);
            detail("thumbnail", &outcome.thumbnail_url);
            detail("time", &outcome.timestamp.to_rfc3339());
            Ok(())
        }
        Err(e) => Err(fail_with(e)),
    }
}

async fn run_probe(service: &CaptureService, advanced: bool) -> Result<()> {
    match service.probe_source().await {
        Ok(report) => {
            note_success(&format!(
                "Stream answered HTTP {} ({}) in {}ms",
                report.status, report.content_type, report.elapsed_ms
            ));
        }
        Err(e) => return Err(fail_with(e)),
    }

    if advanced {
        match service.probe_source_advanced().await {
            Ok(report) => note_success(&format!("ffmpeg decoded the stream ({})", report.marker)),
            Err(e) => note_warn(&redact_sensitive_data(&e.public_message())),
        }
    }
    Ok(())
}

fn fail_with(err: CaptureError) -> anyhow::Error {
    note_error(&redact_sensitive_data(&err.public_message()));
    anyhow::Error::new(err)
}
