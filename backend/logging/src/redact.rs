//! Log Redaction Layer
//!
//! Scrubs camera credentials, bearer tokens, and secret query parameters
//! from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static URL_USERINFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-zA-Z][a-zA-Z0-9+.\-]*://)[^/\s@]+@").unwrap());
static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());
static SECRET_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([?&](?:token|key|password|pass|pwd|secret|signature)=)[^&\s]+").unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = URL_USERINFO_RE
        .replace_all(input, "${1}[REDACTED]@")
        .to_string();

    redacted = BEARER_RE
        .replace_all(&redacted, "Bearer [REDACTED_TOKEN]")
        .to_string();

    redacted = SECRET_PARAM_RE
        .replace_all(&redacted, "${1}[REDACTED]")
        .to_string();

    redacted
}
