//! Config defaults.

/// Inference server address when `OLLAMA_HOST` is unset.
pub const DEFAULT_SERVER_ADDRESS: &str = "http://localhost:11434";

/// Gateway bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Gateway port.
pub const DEFAULT_PORT: u16 = 8787;

/// Model family flagged as recommended in listings.
pub const DEFAULT_PREFERRED_FAMILY: &str = "gemma3";

/// How installed models are judged vision-capable: `pattern` matches the
/// identifier, `metadata` reads the server-reported families first.
pub const DEFAULT_VISION_CLASSIFIER: &str = "pattern";

/// Accepted values for the vision classifier setting.
pub const VISION_CLASSIFIERS: &[&str] = &["pattern", "metadata"];

/// Decoded image size limit (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Bound on the model listing / status check.
pub const DEFAULT_STATUS_TIMEOUT_SECS: u64 = 5;

/// Bound on a generation call.
pub const DEFAULT_GENERATE_TIMEOUT_SECS: u64 = 120;

/// Low temperature keeps transcription literal.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Normalize a server address: add `http://` to a bare `host:port` and strip
/// trailing slashes. Blank input yields the default address.
pub fn normalize_server_address(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_SERVER_ADDRESS.to_string();
    }
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_scheme() {
        assert_eq!(
            normalize_server_address("127.0.0.1:11434"),
            "http://127.0.0.1:11434"
        );
    }

    #[test]
    fn trailing_slash_is_stripped() {
        assert_eq!(
            normalize_server_address("https://gpu-box:11434/"),
            "https://gpu-box:11434"
        );
    }

    #[test]
    fn blank_uses_default() {
        assert_eq!(normalize_server_address("  "), DEFAULT_SERVER_ADDRESS);
    }

    #[test]
    fn image_limit_is_ten_mebibytes() {
        assert_eq!(DEFAULT_MAX_IMAGE_BYTES, 10_485_760);
    }
}
