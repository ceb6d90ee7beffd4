//! Configuration module - Picker settings and user preferences
//!
//! This module provides functionality for:
//! - Loading configuration from ~/.config/runpick/config.json
//! - Default values for all settings
//! - Type definitions for config structures
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions (Config, SelectionMode)
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::{
    DEFAULT_DEBOUNCE_MS, DEFAULT_PROMPT, DEFAULT_SCROLL_BUFFER, FALLBACK_PAGE_SIZE,
};

pub use types::{resolve_prompt, Config, SelectionMode};

pub use loader::{default_config_path, load_config, load_config_from};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
