use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Prompt used when the caller does not supply one.
pub const DEFAULT_PROMPT: &str = "Extract all text from this image. Return only the extracted text, \
preserving the original layout and line breaks where possible.";

/// Human-facing name and blurb for a model identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelDisplayInfo {
    pub name: String,
    pub description: String,
}

/// A model as reported by the inference server's tag listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstalledModel {
    pub identifier: String,
    pub size_bytes: Option<u64>,
    /// Architecture families from the server's model details (e.g. `clip`).
    #[serde(default)]
    pub families: Vec<String>,
    /// The untouched listing entry.
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl InstalledModel {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            size_bytes: None,
            families: Vec::new(),
            raw: serde_json::Value::Null,
        }
    }

    pub fn with_families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.families = families.into_iter().map(Into::into).collect();
        self
    }
}

/// Result of a reachability check. Built fresh on every check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub is_running: bool,
    /// Vision-capable models only, in server order.
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerStatus {
    pub fn running(models: Vec<String>) -> Self {
        Self {
            is_running: true,
            models,
            error: None,
        }
    }

    pub fn down(error: impl Into<String>) -> Self {
        Self {
            is_running: false,
            models: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Post-processing applied to the extracted text.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!(
                "unknown output format '{other}' (expected text, json or markdown)"
            )),
        }
    }
}

/// Image payload as it arrives from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    /// Base64 text, optionally with a `data:<mime>;base64,` prefix.
    Base64(String),
    /// Already-decoded bytes (e.g. read from disk).
    Bytes(Vec<u8>),
}

/// One extraction call. Lives only for the duration of that call.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub image: ImageData,
    pub model: String,
    pub prompt: Option<String>,
    pub output_format: OutputFormat,
}

impl ExtractionRequest {
    pub fn new(model: impl Into<String>, image: ImageData) -> Self {
        Self {
            image,
            model: model.into(),
            prompt: None,
            output_format: OutputFormat::default(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// The caller's prompt, or [`DEFAULT_PROMPT`] when absent or blank.
    pub fn effective_prompt(&self) -> &str {
        match self.prompt.as_deref() {
            Some(p) if !p.trim().is_empty() => p,
            _ => DEFAULT_PROMPT,
        }
    }
}

/// How much the caller should trust the extracted text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Confidence {
    High,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSuccess {
    pub extracted_text: String,
    pub model: String,
    #[serde(rename = "processingTimeMillis")]
    pub processing_time_ms: u64,
    pub image_size_bytes: usize,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionFailure {
    #[serde(rename = "errorKind")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub model: String,
    #[serde(rename = "processingTimeMillis")]
    pub processing_time_ms: u64,
}

/// Outcome of an extraction. Failures are values, never panics or `Err`s.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionResult {
    Succeeded(ExtractionSuccess),
    Failed(ExtractionFailure),
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Succeeded(_))
    }

    /// Extracted text, empty on failure.
    pub fn extracted_text(&self) -> &str {
        match self {
            ExtractionResult::Succeeded(s) => &s.extracted_text,
            ExtractionResult::Failed(_) => "",
        }
    }

    pub fn processing_time_ms(&self) -> u64 {
        match self {
            ExtractionResult::Succeeded(s) => s.processing_time_ms,
            ExtractionResult::Failed(f) => f.processing_time_ms,
        }
    }
}

/// Incremental notifications emitted while an extraction runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum ExtractionEvent {
    Progress(String),
    Chunk(String),
}

/// One row of the model selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub size: String,
    pub available: bool,
    pub recommended: bool,
}

/// Display-ready model list plus the status it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModelListing {
    pub models: Vec<ModelEntry>,
    pub status: ServerStatus,
}
