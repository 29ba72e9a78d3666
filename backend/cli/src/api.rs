use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use doorcam_capture::{CaptureService, MAX_RECENT_RECORDS};
use doorcam_core::{CaptureError, CaptureRequest, ProbeResult};
use doorcam_logging::redact_sensitive_data;
use doorcam_storage::media_router;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

/// Shared application state for API handlers.
pub struct AppState {
    pub service: Arc<CaptureService>,
}

/// Build the Axum router with all API routes. `media_dir` mounts the local
/// blob root under `/media`.
pub fn build_router(state: Arc<AppState>, media_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route("/api/health", get(health))
        .route("/api/record", get(record).post(record))
        .route("/api/test-stream", get(test_stream))
        .route("/api/test-storage", get(test_storage))
        .route("/api/system-status", get(system_status))
        .route("/api/access-records", get(all_records))
        .route("/api/access-records/recent", get(recent_records))
        .route("/api/access-records/:id", get(access_record))
        .with_state(state);

    if let Some(dir) = media_dir {
        app = app.nest("/media", media_router(dir));
    }

    app
}

fn envelope(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    envelope(status, json!({ "success": false, "message": message.into() }))
}

/// Caller-safe failure: trimmed diagnostics, credentials scrubbed.
fn capture_failure(err: &CaptureError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    envelope(
        status,
        json!({
            "success": false,
            "kind": err.kind(),
            "message": redact_sensitive_data(&err.public_message()),
        }),
    )
}

fn probe_response(result: ProbeResult, ok_message: &str) -> Response {
    if result.success {
        envelope(
            StatusCode::OK,
            json!({ "success": true, "message": ok_message, "data": result.detail }),
        )
    } else {
        let message = result
            .error
            .as_deref()
            .map(redact_sensitive_data)
            .unwrap_or_default();
        envelope(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "success": false, "message": message, "data": result.detail }),
        )
    }
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "doorcam",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct RecordParams {
    status: Option<String>,
    duration: Option<String>,
}

/// Capture a clip and persist its access record.
///
/// The run is spawned so a disconnecting caller never cancels it midway.
async fn record(State(state): State<Arc<AppState>>, Query(params): Query<RecordParams>) -> Response {
    let duration = match params.duration.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(seconds) => Some(seconds),
            Err(_) => {
                return failure(
                    StatusCode::BAD_REQUEST,
                    format!("duration must be an integer between 1 and 60, got {raw:?}"),
                )
            }
        },
    };

    let request = match CaptureRequest::parse(params.status.as_deref(), duration) {
        Ok(request) => request,
        Err(e) => return capture_failure(&e),
    };

    let service = state.service.clone();
    let run = tokio::spawn(async move {
        service
            .run_capture_pipeline(request.status, i64::from(request.duration.seconds()))
            .await
    });

    match run.await {
        Ok(Ok(outcome)) => envelope(
            StatusCode::OK,
            json!({
                "success": true,
                "message": "Recording saved",
                "data": outcome,
            }),
        ),
        Ok(Err(e)) => capture_failure(&e),
        Err(e) => {
            error!(error = %e, "Capture task panicked");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "capture task failed")
        }
    }
}

async fn test_stream(State(state): State<Arc<AppState>>) -> Response {
    probe_response(state.service.test_stream().await, "Stream connection succeeded")
}

async fn test_storage(State(state): State<Arc<AppState>>) -> Response {
    probe_response(state.service.probe_storage().await, "Storage connection succeeded")
}

async fn system_status(State(state): State<Arc<AppState>>) -> Response {
    let status = state.service.system_status().await;
    envelope(StatusCode::OK, json!({ "success": true, "data": status }))
}

async fn all_records(State(state): State<Arc<AppState>>) -> Response {
    match state.service.all_records().await {
        Ok(records) => envelope(StatusCode::OK, json!({ "success": true, "data": records })),
        Err(e) => {
            error!(error = %e, "Failed to list access records");
            capture_failure(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecentParams {
    limit: Option<String>,
}

async fn recent_records(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> Response {
    let limit = match params.limit.as_deref().map(str::trim) {
        None | Some("") => 5,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if (1..=MAX_RECENT_RECORDS).contains(&n) => n,
            _ => {
                return failure(
                    StatusCode::BAD_REQUEST,
                    format!("limit must be between 1 and {MAX_RECENT_RECORDS}"),
                )
            }
        },
    };

    match state.service.recent_records(limit).await {
        Ok(records) => envelope(StatusCode::OK, json!({ "success": true, "data": records })),
        Err(e) => {
            error!(error = %e, "Failed to list access records");
            capture_failure(&e)
        }
    }
}

async fn access_record(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.service.record(&id).await {
        Ok(Some(record)) => envelope(StatusCode::OK, json!({ "success": true, "data": record })),
        Ok(None) => failure(StatusCode::NOT_FOUND, format!("access record {id} not found")),
        Err(e) => {
            error!(error = %e, id = %id, "Failed to fetch access record");
            capture_failure(&e)
        }
    }
}
