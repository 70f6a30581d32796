//! Editor configuration
//!
//! Where workflows are stored, which catalog to read and autosave timing.
//! Every field has a default, so a partial (or absent) config file works.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::defaults;
use crate::registry::CatalogSource;

/// Full editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Directory holding workflow documents
    pub workflows_dir: PathBuf,
    /// Node type catalog file; the built-in catalog when unset
    pub catalog_path: Option<PathBuf>,
    /// Seconds between autosave attempts
    pub autosave_interval_secs: u64,
    /// Longest sanitized workflow name, in characters
    pub max_name_length: usize,
    /// Shortest workflow name accepted when saving under a new name
    pub min_name_length: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            workflows_dir: default_workflows_dir(),
            catalog_path: None,
            autosave_interval_secs: defaults::AUTOSAVE_INTERVAL_SECS,
            max_name_length: defaults::MAX_NAME_LENGTH,
            min_name_length: defaults::MIN_NAME_LENGTH,
        }
    }
}

impl EditorConfig {
    /// Load configuration from a JSON file
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {:?}; using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents).map_err(ConfigError::Parse)?;
        log::info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents)?;

        log::info!("Configuration saved to {:?}", path);
        Ok(())
    }

    pub fn catalog_source(&self) -> CatalogSource {
        match &self.catalog_path {
            Some(path) => CatalogSource::File(path.clone()),
            None => CatalogSource::BuiltIn,
        }
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}

/// `<platform data dir>/arquiteto`, if the platform has one
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(defaults::APP_DIR))
}

fn default_workflows_dir() -> PathBuf {
    app_data_dir()
        .map(|dir| dir.join("workflows"))
        .unwrap_or_else(|| PathBuf::from(defaults::FALLBACK_WORKFLOWS_DIR))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}
