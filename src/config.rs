//! Application configuration
//!
//! Loaded from an optional JSON file. Every field has a default so an empty
//! object (or no file at all) is a valid configuration.

use crate::capture::encoder::{DEFAULT_MIME_TYPE, PREFERRED_MIME_TYPES};
use crate::utils::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Directory holding the key-value store partitions
    pub data_dir: PathBuf,

    /// Encoder flush interval in milliseconds
    pub timeslice_ms: u64,

    /// Recording formats to try, most preferred first
    pub preferred_mime_types: Vec<String>,

    /// Mime type assumed when the encoder does not report one
    pub default_mime_type: String,

    /// Prefix of generated recording filenames
    pub filename_prefix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".folder-recorder"),
            timeslice_ms: 1000,
            preferred_mime_types: PREFERRED_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            default_mime_type: DEFAULT_MIME_TYPE.to_string(),
            filename_prefix: "recording".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;

        if config.timeslice_ms == 0 {
            return Err(AppError::Config("timesliceMs must be greater than zero".to_string()));
        }

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.timeslice_ms, 1000);
        assert_eq!(config.default_mime_type, "video/webm");
        assert_eq!(config.filename_prefix, "recording");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"timesliceMs": 250}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.timeslice(), Duration::from_millis(250));
        assert!(!config.preferred_mime_types.is_empty());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(AppConfig::load(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_timeslice_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"timesliceMs": 0}"#).unwrap();

        assert!(matches!(AppConfig::load(&path), Err(AppError::Config(_))));
    }
}
