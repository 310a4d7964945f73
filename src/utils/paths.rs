//! Cross-Platform Path Utilities
//!
//! Resolves where the configuration file lives.

use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "VISA_ADVISOR_CONFIG";

const APP_DIR_NAME: &str = "visa-advisor";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the per-user application directory (`<config_dir>/visa-advisor/`)
pub fn app_config_dir() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| AppError::config("Could not determine config directory"))
}

/// Get the default config file path (`<config_dir>/visa-advisor/config.toml`)
pub fn default_config_path() -> AppResult<PathBuf> {
    Ok(app_config_dir()?.join(CONFIG_FILE_NAME))
}

/// Pick the config file to load.
///
/// An explicit path wins, then `VISA_ADVISOR_CONFIG`, then the per-user
/// default if it exists. `None` means built-in defaults.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    default_config_path().ok().filter(|path| path.exists())
}
