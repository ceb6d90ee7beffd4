//! Configuration loading from file system
//!
//! Reads `config.json` and falls back to defaults on any failure.

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::defaults::DEFAULT_CONFIG_PATH;
use super::types::Config;

/// The default config location with `~` expanded.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).as_ref())
}

/// Load configuration from ~/.config/runpick/config.json
///
/// Returns Config::default() if the file is missing or invalid.
pub fn load_config() -> Config {
    load_config_from(&default_config_path())
}

/// Load configuration from an explicit path.
///
/// A missing file is not an error. A file that exists but fails to read or
/// parse is logged with the serde error and replaced by defaults, so a typo in
/// the config never keeps the prompt from coming up.
#[instrument(name = "load_config", fields(path = %config_path.display()))]
pub fn load_config_from(config_path: &Path) -> Config {
    if !config_path.exists() {
        info!("Config file not found, using defaults");
        return Config::default();
    }

    let contents = match std::fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(error = %e, "Failed to read config file, using defaults");
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&contents) {
        Ok(config) => {
            if let Err(e) = config.validate() {
                warn!(error = %e, "Invalid config values, using defaults");
                return Config::default();
            }
            info!(
                selection_mode = ?config.selection_mode,
                max_results = ?config.max_results,
                "Successfully loaded config"
            );
            config
        }
        Err(e) => {
            let error_hint = if e.to_string().contains("unknown variant") {
                "\n\nHint: selectionMode must be \"single\" or \"multi\"."
            } else {
                ""
            };
            warn!(
                error = %e,
                hint = %error_hint,
                "Failed to parse config JSON, using defaults"
            );
            Config::default()
        }
    }
}
