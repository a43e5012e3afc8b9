//! Telemetry and structured logging for textlens.
//!
//! Handles subscriber setup, log redaction, and extraction event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, ExtractionLogEvent};
pub use logger::{init_logger, ConsoleTarget, LogOptions};
pub use redact::{preview, redact_sensitive_data};
