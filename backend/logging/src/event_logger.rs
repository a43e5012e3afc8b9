//! Extraction Event Logger
//!
//! Structured extraction lifecycle events written through `tracing`, so they
//! land in the rolling NDJSON file alongside everything else.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::{preview, redact_sensitive_data};

const TEXT_PREVIEW_CHARS: usize = 80;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractionLogEvent {
    Started {
        model: String,
        image_bytes: usize,
        mime_type: Option<String>,
        streaming: bool,
    },
    Completed {
        model: String,
        elapsed_ms: u64,
        text_chars: usize,
        text_preview: String,
    },
    Failed {
        model: String,
        elapsed_ms: u64,
        kind: String,
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: ExtractionLogEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Logs an extraction event, scrubbing any text it carries first.
    pub fn log_event(request_id: &str, mut event: ExtractionLogEvent) {
        let failed = matches!(event, ExtractionLogEvent::Failed { .. });

        match &mut event {
            ExtractionLogEvent::Started { .. } => {}
            ExtractionLogEvent::Completed { text_preview, .. } => {
                *text_preview = preview(text_preview, TEXT_PREVIEW_CHARS);
            }
            ExtractionLogEvent::Failed { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
        }

        let entry = EventLogEntry {
            request_id: request_id.into(),
            timestamp: Utc::now(),
            event,
        };

        let json = serde_json::to_string(&entry).unwrap_or_default();
        if failed {
            warn!(target: "extraction_events", event = %json, "Extraction event");
        } else {
            info!(target: "extraction_events", event = %json, "Extraction event");
        }
    }
}
