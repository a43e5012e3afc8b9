//! Process-wide settings, read once from the environment at startup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::defaults::*;

/// textlens runtime configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    /// Inference server base URL (no trailing slash)
    pub server_address: String,
    /// Gateway bind address
    pub bind_address: String,
    /// Gateway port
    pub port: u16,
    /// Family flagged `recommended` in model listings
    pub preferred_family: String,
    /// `pattern` or `metadata`
    pub vision_classifier: String,
    /// Decoded image size limit in bytes
    pub max_image_bytes: usize,
    pub status_timeout_secs: u64,
    pub generate_timeout_secs: u64,
    pub temperature: f32,
    pub num_predict: Option<u32>,
    /// Log level / filter
    pub log_level: String,
    /// Directory for rolling file logs; console only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            preferred_family: DEFAULT_PREFERRED_FAMILY.to_string(),
            vision_classifier: DEFAULT_VISION_CLASSIFIER.to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            status_timeout_secs: DEFAULT_STATUS_TIMEOUT_SECS,
            generate_timeout_secs: DEFAULT_GENERATE_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
            num_predict: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_dir: None,
        }
    }
}

impl Settings {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self::from_env_map(&std::env::vars().collect())
    }

    /// Load configuration from a provided map (useful for testing).
    pub fn from_env_map(env: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            env.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        Self {
            server_address: get("OLLAMA_HOST")
                .map(normalize_server_address)
                .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string()),
            bind_address: get("TEXTLENS_BIND")
                .unwrap_or(DEFAULT_BIND_ADDRESS)
                .to_string(),
            port: parse_or(get("TEXTLENS_PORT"), "TEXTLENS_PORT", DEFAULT_PORT),
            preferred_family: get("TEXTLENS_PREFERRED_FAMILY")
                .unwrap_or(DEFAULT_PREFERRED_FAMILY)
                .to_lowercase(),
            vision_classifier: get("TEXTLENS_VISION_CLASSIFIER")
                .unwrap_or(DEFAULT_VISION_CLASSIFIER)
                .to_lowercase(),
            max_image_bytes: parse_or(
                get("TEXTLENS_MAX_IMAGE_BYTES"),
                "TEXTLENS_MAX_IMAGE_BYTES",
                DEFAULT_MAX_IMAGE_BYTES,
            ),
            status_timeout_secs: parse_or(
                get("TEXTLENS_STATUS_TIMEOUT_SECS"),
                "TEXTLENS_STATUS_TIMEOUT_SECS",
                DEFAULT_STATUS_TIMEOUT_SECS,
            ),
            generate_timeout_secs: parse_or(
                get("TEXTLENS_GENERATE_TIMEOUT_SECS"),
                "TEXTLENS_GENERATE_TIMEOUT_SECS",
                DEFAULT_GENERATE_TIMEOUT_SECS,
            ),
            temperature: parse_or(
                get("TEXTLENS_TEMPERATURE"),
                "TEXTLENS_TEMPERATURE",
                DEFAULT_TEMPERATURE,
            ),
            num_predict: get("TEXTLENS_NUM_PREDICT").and_then(|v| match v.parse() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!(var = "TEXTLENS_NUM_PREDICT", value = %v, "Ignoring unparseable value");
                    None
                }
            }),
            log_level: get("RUST_LOG").unwrap_or(DEFAULT_LOG_LEVEL).to_string(),
            log_dir: get("TEXTLENS_LOG_DIR").map(PathBuf::from),
        }
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }

    /// `bind:port` for the gateway listener.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn parse_or<T: FromStr>(value: Option<&str>, var: &str, default: T) -> T {
    match value {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(var, value = %raw, "Ignoring unparseable value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let s = Settings::from_env_map(&HashMap::new());
        assert_eq!(s.server_address, "http://localhost:11434");
        assert_eq!(s.port, 8787);
        assert_eq!(s.preferred_family, "gemma3");
        assert_eq!(s.vision_classifier, "pattern");
        assert_eq!(s.max_image_bytes, 10 * 1024 * 1024);
        assert_eq!(s.status_timeout(), Duration::from_secs(5));
        assert_eq!(s.generate_timeout(), Duration::from_secs(120));
        assert!(s.num_predict.is_none());
        assert!(s.log_dir.is_none());
    }

    #[test]
    fn reads_overrides() {
        let s = Settings::from_env_map(&env(&[
            ("OLLAMA_HOST", "10.0.0.5:11434/"),
            ("TEXTLENS_PORT", "9000"),
            ("TEXTLENS_PREFERRED_FAMILY", "LLaVA"),
            ("TEXTLENS_NUM_PREDICT", "512"),
            ("TEXTLENS_VISION_CLASSIFIER", "Metadata"),
            ("TEXTLENS_LOG_DIR", "/var/log/textlens"),
        ]));
        assert_eq!(s.server_address, "http://10.0.0.5:11434");
        assert_eq!(s.port, 9000);
        assert_eq!(s.preferred_family, "llava");
        assert_eq!(s.num_predict, Some(512));
        assert_eq!(s.vision_classifier, "metadata");
        assert_eq!(s.log_dir, Some(PathBuf::from("/var/log/textlens")));
        assert_eq!(s.listen_address(), "127.0.0.1:9000");
    }

    #[test]
    fn unparseable_numbers_fall_back() {
        let s = Settings::from_env_map(&env(&[
            ("TEXTLENS_PORT", "eighty"),
            ("TEXTLENS_TEMPERATURE", "warm"),
            ("TEXTLENS_NUM_PREDICT", "-3"),
        ]));
        assert_eq!(s.port, DEFAULT_PORT);
        assert_eq!(s.temperature, DEFAULT_TEMPERATURE);
        assert!(s.num_predict.is_none());
    }
}
