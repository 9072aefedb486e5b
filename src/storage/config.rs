//! Application configuration.
//!
//! Loaded from `config.toml` in the platform data directory. A missing file
//! yields defaults; relative storage paths resolve against the data directory.

use crate::storage::blob_store::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Storage settings
    pub storage: StorageSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            storage: StorageSettings::default(),
        }
    }
}

impl AppConfig {
    /// Primary database path.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.database_file)
    }

    /// Fallback blob directory.
    pub fn fallback_dir(&self) -> PathBuf {
        self.data_dir.join(&self.storage.fallback_dir)
    }
}

/// Storage-related settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite file name
    pub database_file: String,
    /// Directory for fallback blobs
    pub fallback_dir: String,
    /// History entries kept in the fallback blob
    pub fallback_history_limit: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_file: "farmtrack.db".to_string(),
            fallback_dir: "fallback".to_string(),
            fallback_history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "farmtrack", "FarmTrack")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path(), get_data_dir())
}

/// Load configuration from `path`, with `data_dir` as the storage root.
pub fn load_config_from(path: &Path, data_dir: PathBuf) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(AppConfig {
            data_dir,
            ..Default::default()
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    if config.storage.fallback_history_limit == 0 {
        return Err(ConfigError::Invalid(
            "storage.fallback_history_limit must be at least 1".to_string(),
        ));
    }

    config.data_dir = data_dir;

    Ok(config)
}

/// Save application configuration to `path`.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
