//! TOML Configuration Loading
//!
//! Reads `config.toml`, applies environment overrides and validates the
//! result.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::resolve_config_path;

/// Configuration service holding the loaded settings
#[derive(Debug, Default)]
pub struct ConfigService {
    config_path: Option<PathBuf>,
    config: AppConfig,
}

impl ConfigService {
    /// Load configuration from the resolved path (or defaults) and apply
    /// process environment overrides.
    pub fn load(explicit: Option<PathBuf>) -> AppResult<Self> {
        let config_path = resolve_config_path(explicit);
        let mut config = match &config_path {
            Some(path) => Self::read_file(path)?,
            None => AppConfig::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate().map_err(AppError::config)?;

        match &config_path {
            Some(path) => tracing::info!("[Config] loaded {}", path.display()),
            None => tracing::info!("[Config] no config file found, using defaults"),
        }

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load a specific file without environment overrides
    pub fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let config = Self::read_file(path)?;
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }

    fn read_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// Path the configuration came from, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
