//! Content types for stored artifacts, derived from the key's extension.

use std::path::Path;

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "webp"         => "image/webp",

        "mp4"          => "video/mp4",
        "webm"         => "video/webm",
        "mov"          => "video/quicktime",
        "mkv"          => "video/x-matroska",

        "json"         => "application/json",
        "txt"          => "text/plain",

        _              => "application/octet-stream",
    }
}

/// Whether a file is safe to render in the browser rather than download.
pub fn is_inline_safe(mime: &str) -> bool {
    matches!(
        mime,
        "image/jpeg" | "image/png" | "image/webp" | "video/mp4" | "video/webm" | "text/plain"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_artifact_types() {
        assert_eq!(detect_mime_type(Path::new("thumbnails/t.jpg")), "image/jpeg");
        assert_eq!(detect_mime_type(Path::new("videos/r.MP4")), "video/mp4");
    }

    #[test]
    fn unknown_extension_fallback() {
        assert_eq!(detect_mime_type(Path::new("test/probe.bin")), "application/octet-stream");
        assert!(!is_inline_safe("application/octet-stream"));
    }
}
