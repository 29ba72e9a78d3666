//! Local media server: serves blobs from the local store over HTTP.
//!
//! Mounted at `/media`, so a blob written under `videos/record_x.mp4` is
//! reachable at `/media/videos/record_x.mp4`, matching the URLs the local
//! blob store resolves.

use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::fs;
use tracing::{debug, warn};

use crate::keys::validate_key;
use crate::mime_detect::{detect_mime_type, is_inline_safe};

#[derive(Clone)]
pub struct MediaServerState {
    pub media_dir: Arc<PathBuf>,
}

/// Build the media router. Mount under `/media`.
pub fn media_router(media_dir: PathBuf) -> Router {
    let state = MediaServerState {
        media_dir: Arc::new(media_dir),
    };
    Router::new()
        .route("/*key", get(serve_media))
        .with_state(state)
}

/// GET /*key: return a stored blob.
async fn serve_media(Path(key): Path<String>, State(state): State<MediaServerState>) -> Response {
    if let Err(e) = validate_key(&key) {
        warn!(key = %key, error = %e, "Rejected suspicious media path");
        return (StatusCode::BAD_REQUEST, "Invalid media key").into_response();
    }

    let path = state.media_dir.join(&key);
    debug!(path = %path.display(), "Serving media file");

    match fs::read(&path).await {
        Ok(bytes) => {
            let mime = detect_mime_type(&path);
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let disposition = if is_inline_safe(mime) {
                format!("inline; filename=\"{filename}\"")
            } else {
                format!("attachment; filename=\"{filename}\"")
            };

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "Media file not found").into_response()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read media file");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read media").into_response()
        }
    }
}
