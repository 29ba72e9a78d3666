//! Blob key validation shared by the local store and the media server.

use anyhow::{bail, Result};

/// Keys are relative, `/`-separated, and never step outside the store root.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        bail!("blob key is empty");
    }
    if key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        bail!("blob key {key:?} must be a relative path");
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        bail!("blob key {key:?} contains an invalid path segment");
    }
    Ok(())
}

/// Join `key` onto a base URL with exactly one separating slash.
pub fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}
