//! Structured Logger
//!
//! Wraps `tracing` to provide console output, optional daily-rotated NDJSON
//! files, and environment-based level control.

use std::path::PathBuf;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Where console output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    /// Keeps stdout clean for command output.
    Stderr,
}

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Default filter; `RUST_LOG` takes precedence.
    pub level: String,
    /// Rolling file directory; no file layer when `None`.
    pub log_dir: Option<PathBuf>,
    pub console: ConsoleTarget,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            console: ConsoleTarget::Stdout,
        }
    }
}

/// Initialize the global structured logger.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger(options: &LogOptions) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.level));

    let console_layer = match options.console {
        ConsoleTarget::Stdout => fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
            .boxed(),
        ConsoleTarget::Stderr => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true)
            .boxed(),
    };

    // Rolling file appender: writes NDJSON to `<dir>/textlens.log.YYYY-MM-DD`
    let file_layer = options.log_dir.as_ref().map(|dir| {
        let file_appender = tracing_appender::rolling::daily(dir, "textlens.log");
        fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_ansi(false)
            .boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
