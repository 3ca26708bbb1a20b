use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{IntakeError, Result};

/// Top-level configuration for the intake service.
///
/// Loaded from a TOML file; every section has working defaults so a missing
/// or partial file still yields a runnable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntakeConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl IntakeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: IntakeConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or unparsable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| IntakeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Public base URL used when rendering submission links in notifications.
    pub base_url: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("intake.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Minimum interval between two deliveries, in milliseconds.
    pub min_send_interval_ms: u64,
    /// Sleep after a delivery or persistence failure, in seconds.
    pub error_backoff_secs: u64,
    /// When true, deliveries are logged instead of sent.
    pub dev_mode: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            min_send_interval_ms: 10,
            error_backoff_secs: 60,
            dev_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_runnable() {
        let config = IntakeConfig::default();
        assert_eq!(config.notifications.min_send_interval_ms, 10);
        assert_eq!(config.notifications.error_backoff_secs, 60);
        assert!(!config.notifications.dev_mode);
        assert_eq!(config.storage.db_path, PathBuf::from("intake.db"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = IntakeConfig::default();
        config.general.base_url = "https://intake.example.org".to_string();
        config.notifications.dev_mode = true;
        config.save(&path).unwrap();

        let loaded = IntakeConfig::load(&path).unwrap();
        assert_eq!(loaded.general.base_url, "https://intake.example.org");
        assert!(loaded.notifications.dev_mode);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nbase_url = \"https://x.test\"\n").unwrap();

        let loaded = IntakeConfig::load(&path).unwrap();
        assert_eq!(loaded.general.base_url, "https://x.test");
        assert_eq!(loaded.notifications.min_send_interval_ms, 10);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = IntakeConfig::load_or_default(Path::new("/nonexistent/intake.toml"));
        assert_eq!(config.general.base_url, "http://localhost:8080");
    }
}
