use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, warn};

/// Domain-specific errors for runpick
#[derive(Error, Debug)]
pub enum PickerError {
    #[error("Failed to parse protocol message: {0}")]
    ProtocolParse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bus name '{}' is already owned by another instance", path.display())]
    NameTaken { path: PathBuf },

    #[error("Failed to bind bus socket '{}': {source}", path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Terminal operation failed: {0}")]
    Terminal(String),

    #[error("Bus connection closed before the prompt finished")]
    Disconnected,

    #[error("Service rejected request: {0}")]
    Rejected(String),
}

impl PickerError {
    /// Whether this error can only be resolved by operator action
    /// (another instance running, socket directory not writable, ...).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NameTaken { .. } | Self::Bind { .. })
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::ProtocolParse(e) => format!("Invalid message format: {}", e),
            Self::Io(e) => format!("I/O failure: {}", e),
            Self::NameTaken { path } => format!(
                "Another runpick instance is already serving {}",
                path.display()
            ),
            Self::Bind { path, .. } => format!("Could not listen on {}", path.display()),
            Self::Config(msg) => format!("Configuration issue: {}", msg),
            Self::Terminal(msg) => format!("Terminal issue: {}", msg),
            Self::Disconnected => "runpick service went away".to_string(),
            Self::Rejected(msg) => msg.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PickerError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use runpick::error::ResultExt;
///
/// // A subscriber that hung up is dropped, the broadcast continues
/// stream.write_all(line.as_bytes()).warn_on_err();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}
