//! Structured JSONL logging with optional human-readable stderr output.
//!
//! This module provides dual-output logging:
//! - **JSONL to file** (`<cache>/runpick/logs/<name>.jsonl`) - structured, one object per line
//! - **Compact to stderr** - human-readable, opt-in
//!
//! The stderr layer is off while the terminal surface owns the screen, since
//! anything written to the shared tty would tear the prompt.
//!
//! # Usage
//!
//! ```rust,ignore
//! use runpick::logging::{self, LogOptions};
//!
//! // Initialize logging - MUST keep guard alive for duration of program
//! let _guard = logging::init(LogOptions::service());
//!
//! // Use tracing macros directly
//! tracing::info!(event_type = "invocation", action = "show", "Prompt shown");
//! ```
//!
//! # JSONL Output Format
//!
//! ```json
//! {"timestamp":"2026-10-18T10:30:45.123Z","level":"INFO","target":"runpick::service","fields":{"message":"Prompt shown","event_type":"invocation","action":"show"}}
//! ```

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard will flush and close the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Where log output goes for one binary.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Stem of the JSONL file under the log directory
    pub file_name: &'static str,
    /// Mirror events to stderr in compact form
    pub stderr: bool,
}

impl LogOptions {
    /// The service draws on the terminal, so stderr stays quiet by default.
    pub fn service() -> Self {
        LogOptions {
            file_name: "runpick",
            stderr: false,
        }
    }

    /// The relay's stdout carries the selection, stderr is free for diagnostics.
    pub fn relay() -> Self {
        LogOptions {
            file_name: "pick",
            stderr: false,
        }
    }
}

/// Initialize the logging system.
///
/// Returns a guard that MUST be kept alive for the duration of the program.
/// Dropping the guard will flush remaining logs and close the file.
pub fn init(options: LogOptions) -> LoggingGuard {
    let log_dir = get_log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("[LOGGING] Failed to create log directory: {}", e);
    }

    let path = log_path(options.file_name);

    // A missing log file must not stop the prompt from working
    let (json_layer, file_guard) = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        Ok(file) => {
            // Non-blocking writer keeps file I/O off the event loop
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .with_span_events(FmtSpan::NONE);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("[LOGGING] Failed to open log file: {}", e);
            (None, None)
        }
    };

    // Environment filter - default to info, allow override via RUST_LOG
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = options.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .compact()
    });

    // try_init: a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(stderr_layer)
        .try_init();

    tracing::info!(
        event_type = "app_lifecycle",
        action = "started",
        log_path = %path.display(),
        "Application logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}

/// Get the log directory path (`<cache>/runpick/logs/`)
fn get_log_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|c| c.join("runpick").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("runpick-logs"))
}

/// Get the path to a JSONL log file
pub fn log_path(file_name: &str) -> PathBuf {
    get_log_dir().join(format!("{}.jsonl", file_name))
}

// =============================================================================
// STRUCTURED LOGGING HELPERS
// =============================================================================

/// Log an invocation lifecycle event (show, commit, cancel, reset)
pub fn log_invocation_event(action: &str, request_id: Option<&str>, item_count: usize) {
    tracing::info!(
        event_type = "invocation",
        action = action,
        request_id = request_id,
        item_count = item_count,
        "Invocation {} ({} items)",
        action,
        item_count
    );
}

/// Log a keyboard event with structured fields
pub fn log_key_event(key: &str, modifiers: &str, action: &str) {
    tracing::debug!(
        event_type = "key_event",
        key = key,
        modifiers = modifiers,
        action = action,
        "Key {} {}",
        action,
        key
    );
}

/// Log a performance metric with structured fields
pub fn log_perf(operation: &str, duration_us: u128, threshold_us: u128) {
    let duration_ms = duration_us as f64 / 1000.0;
    let threshold_ms = threshold_us as f64 / 1000.0;

    if duration_us > threshold_us {
        tracing::warn!(
            event_type = "performance",
            operation = operation,
            duration_ms = duration_ms,
            threshold_ms = threshold_ms,
            is_slow = true,
            "Slow operation: {} took {:.2}ms (threshold: {:.2}ms)",
            operation,
            duration_ms,
            threshold_ms
        );
    } else {
        tracing::debug!(
            event_type = "performance",
            operation = operation,
            duration_ms = duration_ms,
            threshold_ms = threshold_ms,
            is_slow = false,
            "Operation {} completed in {:.2}ms",
            operation,
            duration_ms
        );
    }
}

/// Log an error with structured fields and context
pub fn log_error(category: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        event_type = "error",
        category = category,
        error_message = error,
        context = context,
        "{}: {}",
        category,
        error
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_uses_file_stem() {
        let path = log_path("runpick");
        assert_eq!(path.file_name().unwrap(), "runpick.jsonl");
        assert!(path.parent().unwrap().ends_with("logs"));
    }

    #[test]
    fn test_service_options_keep_stderr_quiet() {
        let options = LogOptions::service();
        assert!(!options.stderr);
        assert_eq!(options.file_name, "runpick");
    }

    #[test]
    fn test_structured_helpers_without_subscriber() {
        // No subscriber installed: helpers must be no-ops, not panics
        log_invocation_event("show", Some("req-1"), 3);
        log_key_event("enter", "none", "commit");
        log_perf("filter", 20_000, 8_000);
        log_error("BUS", "connection reset", None);
    }
}
