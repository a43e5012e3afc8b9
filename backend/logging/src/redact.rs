//! Log Redaction Layer
//!
//! Scrubs access tokens, phone numbers and inline image payloads from strings
//! prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static TELEPHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap());
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(sk-[a-zA-Z0-9]{32,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap());
static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"data:[a-zA-Z0-9.+/-]+;base64,").unwrap());
static BASE64_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/]{128,}={0,2}").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = DATA_URL_RE.replace_all(input, "").to_string();

    // Image payloads first, so the phone pattern never sees their digits
    redacted = BASE64_RUN_RE
        .replace_all(&redacted, |caps: &regex::Captures| {
            format!("[IMAGE_DATA {} chars]", caps[0].len())
        })
        .to_string();

    redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]").to_string();
    redacted = TELEPHONE_RE.replace_all(&redacted, "[REDACTED_PHONE]").to_string();

    redacted
}

/// First `max_chars` characters of `text`, redacted, for log previews.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut cut: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some() {
        cut.push('…');
    }
    redact_sensitive_data(&cut)
}
