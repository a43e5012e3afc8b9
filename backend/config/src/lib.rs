//! Runtime configuration for textlens.
//!
//! Provides:
//! - Environment-driven settings, read once at process start
//! - Default values
//! - Validation with field paths

pub mod defaults;
pub mod settings;
pub mod validation;

pub use defaults::normalize_server_address;
pub use settings::Settings;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};

/// Read settings from the environment, validate them, and log the findings.
///
/// This is the main entry point for loading settings at runtime.
pub fn load_settings() -> Result<Settings> {
    prepare(Settings::from_env())
}

/// Validate already-loaded settings.
pub fn prepare(settings: Settings) -> Result<Settings> {
    let report = validate(&settings);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.first() {
        bail!("{} ({} config error(s))", first, report.errors.len());
    }
    Ok(settings)
}
