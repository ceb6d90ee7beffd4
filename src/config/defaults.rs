//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Prompt shown when the caller passes an empty or missing prompt
pub const DEFAULT_PROMPT: &str = ">";

/// Rows kept between the cursor and the viewport edge before scrolling
pub const DEFAULT_SCROLL_BUFFER: usize = 2;

/// Delay before a query edit triggers a recompute (milliseconds)
pub const DEFAULT_DEBOUNCE_MS: u64 = 30;

/// Page size used when neither the config nor the surface provides one
pub const FALLBACK_PAGE_SIZE: usize = 10;

/// Location of the user config file
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/runpick/config.json";

/// File name of the bus socket inside the runtime directory
pub const SOCKET_FILE_NAME: &str = "runpick.sock";
