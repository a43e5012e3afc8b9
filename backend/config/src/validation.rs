//! Settings validation with user-friendly error messages.

use std::net::IpAddr;

use crate::defaults::{DEFAULT_MAX_IMAGE_BYTES, VISION_CLASSIFIERS};
use crate::settings::Settings;
use thiserror::Error;

/// A validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate settings and return a report of all errors and warnings.
pub fn validate(settings: &Settings) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(settings, &mut report);
    validate_limits(settings, &mut report);
    validate_gateway(settings, &mut report);
    report
}

fn validate_server(settings: &Settings, report: &mut ValidationReport) {
    let address = settings.server_address.trim();
    if address.is_empty() {
        report.error("server_address", "Inference server address cannot be empty");
        return;
    }
    if !(address.starts_with("http://") || address.starts_with("https://")) {
        report.error(
            "server_address",
            format!("Unsupported scheme in '{address}'; expected http:// or https://"),
        );
    }
}

fn validate_limits(settings: &Settings, report: &mut ValidationReport) {
    if settings.max_image_bytes == 0 {
        report.error("max_image_bytes", "Image size limit must be greater than zero");
    } else if settings.max_image_bytes > DEFAULT_MAX_IMAGE_BYTES {
        report.warn(
            "max_image_bytes",
            "Image size limit is above 10 MiB; large images may exhaust the model context",
        );
    }
    if settings.status_timeout_secs == 0 {
        report.error("status_timeout_secs", "Status timeout must be at least 1 second");
    }
    if settings.generate_timeout_secs == 0 {
        report.error(
            "generate_timeout_secs",
            "Generation timeout must be at least 1 second",
        );
    }
    if !(0.0..=2.0).contains(&settings.temperature) {
        report.error("temperature", "Temperature must be between 0.0 and 2.0");
    }
    if settings.num_predict == Some(0) {
        report.error("num_predict", "Token cap must be greater than zero when set");
    }
}

fn validate_gateway(settings: &Settings, report: &mut ValidationReport) {
    if !VISION_CLASSIFIERS.contains(&settings.vision_classifier.as_str()) {
        report.error(
            "vision_classifier",
            format!(
                "Unknown classifier '{}'; expected one of {}",
                settings.vision_classifier,
                VISION_CLASSIFIERS.join(", ")
            ),
        );
    }
    if settings.preferred_family.trim().is_empty() {
        report.warn("preferred_family", "No preferred family; nothing will be recommended");
    }
    match settings.bind_address.parse::<IpAddr>() {
        Ok(ip) if !ip.is_loopback() => report.warn(
            "bind_address",
            format!("Gateway binds to {ip}; the extraction API has no authentication"),
        ),
        Ok(_) => {}
        Err(_) if settings.bind_address == "localhost" => {}
        Err(_) => report.error(
            "bind_address",
            format!("'{}' is not an IP address", settings.bind_address),
        ),
    }
}
