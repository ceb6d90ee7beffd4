//! Configuration type definitions
//!
//! This module contains all the struct and enum definitions for configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;
use crate::error::PickerError;

// ============================================
// SELECTION MODE
// ============================================

/// Which of the two picker variants is active.
///
/// - `Single`: Tab cycles the cursor, Enter commits the highlighted item.
/// - `Multi`: Tab / Shift+Enter toggle and advance, Ctrl+Space toggles in
///   place, Enter commits the toggled items (or the highlighted one).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    Single,
    Multi,
}

impl SelectionMode {
    pub fn is_multi(self) -> bool {
        matches!(self, SelectionMode::Multi)
    }
}

impl std::str::FromStr for SelectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(SelectionMode::Single),
            "multi" => Ok(SelectionMode::Multi),
            other => Err(format!("unknown selection mode '{}'", other)),
        }
    }
}

// ============================================
// MAIN CONFIG
// ============================================

/// Top-level picker configuration, read from `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Single or multi select (default: single)
    #[serde(default)]
    pub selection_mode: SelectionMode,
    /// Rows per page; None follows the surface height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Rows kept between cursor and viewport edge (default: 2)
    #[serde(default = "default_scroll_buffer")]
    pub scroll_buffer: usize,
    /// Cap on the number of matches kept; None keeps all of them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    /// Query recompute delay in milliseconds; 0 recomputes on every keystroke
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Prompt used when a caller sends none (default: ">")
    #[serde(default = "default_prompt")]
    pub default_prompt: String,
    /// Bus socket path; None uses the runtime directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<String>,
}

fn default_scroll_buffer() -> usize {
    DEFAULT_SCROLL_BUFFER
}
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            selection_mode: SelectionMode::default(),
            page_size: None,
            scroll_buffer: DEFAULT_SCROLL_BUFFER,
            max_results: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            default_prompt: DEFAULT_PROMPT.to_string(),
            socket_path: None,
        }
    }
}

impl Config {
    /// Page size to use given the rows the surface can show.
    ///
    /// An explicit `pageSize` wins, then the surface height, then
    /// [`FALLBACK_PAGE_SIZE`]. Never returns 0.
    pub fn get_page_size(&self, surface_rows: Option<usize>) -> usize {
        self.page_size
            .or(surface_rows)
            .unwrap_or(FALLBACK_PAGE_SIZE)
            .max(1)
    }

    /// Debounce delay, or None when recompute should be immediate.
    pub fn get_debounce(&self) -> Option<Duration> {
        (self.debounce_ms > 0).then(|| Duration::from_millis(self.debounce_ms))
    }

    /// Resolved bus socket path.
    ///
    /// `socketPath` is tilde-expanded; otherwise the socket lives in
    /// `$XDG_RUNTIME_DIR`, falling back to the temp dir.
    pub fn get_socket_path(&self) -> PathBuf {
        match &self.socket_path {
            Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
            None => dirs::runtime_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(SOCKET_FILE_NAME),
        }
    }

    /// Reject values that would leave the picker unusable.
    ///
    /// `maxResults: 0` would hide every match and `pageSize: 0` would show
    /// no rows, so both are configuration errors rather than silent clamps.
    pub fn validate(&self) -> Result<(), PickerError> {
        if self.max_results == Some(0) {
            return Err(PickerError::Config(
                "maxResults must be at least 1 (omit it to keep every match)".to_string(),
            ));
        }
        if self.page_size == Some(0) {
            return Err(PickerError::Config(
                "pageSize must be at least 1 (omit it to follow the terminal height)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Prompt to display for a caller-supplied prompt string.
///
/// Blank or missing prompts fall back to `default`.
pub fn resolve_prompt(prompt: Option<&str>, default: &str) -> String {
    match prompt.map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => default.to_string(),
    }
}
