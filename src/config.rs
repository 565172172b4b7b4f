/// Application settings
///
/// Stored as JSON in the user's config directory:
/// - Linux: ~/.config/herbarium/settings.json
/// - macOS: ~/Library/Application Support/herbarium/settings.json
/// - Windows: %APPDATA%\herbarium\settings.json
///
/// A missing file means defaults. Missing keys fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compute::qr::DEFAULT_QR_SIZE;
use crate::error::ConfigError;
use crate::jobs::ChannelOptions;
use crate::state::edit::{Thresholds, DEFAULT_MAP_LINK_BASE};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Upper bound of the threshold scale (255 = byte scale, 1 = normalized)
    pub threshold_max: f32,
    /// Thresholds for the first edge job of a freshly imported image
    pub default_thresholds: Thresholds,
    /// Prefix for synthesized map links; `<lat>,<lon>` is appended
    pub map_link_base: String,
    /// QR rendering side length in pixels
    pub qr_size: usize,
    /// Jobs the computation unit runs at once
    pub max_concurrent_jobs: usize,
    /// Give up on a job after this many seconds (None = wait forever)
    pub job_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold_max: 255.0,
            default_thresholds: Thresholds::default(),
            map_link_base: DEFAULT_MAP_LINK_BASE.to_string(),
            qr_size: DEFAULT_QR_SIZE,
            max_concurrent_jobs: 4,
            job_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Load from the default location
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings = Self::from_json(&json)?;
        settings.validate()?;
        tracing::info!(path = %path.display(), "📁 settings loaded");
        Ok(settings)
    }

    /// Get the path where the settings file lives
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("herbarium");
        path.push("settings.json");
        Some(path)
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.threshold_max.is_finite() && self.threshold_max > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "threshold_max must be positive, got {}",
                self.threshold_max
            )));
        }
        self.default_thresholds
            .validate(self.threshold_max)
            .map_err(|err| ConfigError::Invalid(format!("default_thresholds: {err}")))?;
        if self.max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid("max_concurrent_jobs must be at least 1".into()));
        }
        if self.qr_size == 0 {
            return Err(ConfigError::Invalid("qr_size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn channel_options(&self) -> ChannelOptions {
        ChannelOptions {
            max_concurrent_jobs: self.max_concurrent_jobs,
            job_timeout: self.job_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "threshold_max": 1.0,
            "default_thresholds": { "low": 0.2, "high": 0.7 } }"#)
        .unwrap();
        assert_eq!(settings.threshold_max, 1.0);
        assert_eq!(settings.qr_size, DEFAULT_QR_SIZE);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_defaults_outside_scale_are_rejected() {
        let settings = Settings {
            threshold_max: 1.0,
            ..Settings::default()
        };
        assert_matches!(settings.validate(), Err(ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        assert_eq!(Settings::load_from(&path).unwrap(), Settings::default());

        let custom = Settings {
            job_timeout_secs: Some(30),
            ..Settings::default()
        };
        std::fs::write(&path, custom.to_json().unwrap()).unwrap();
        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, custom);
        assert_eq!(loaded.channel_options().job_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_matches!(Settings::load_from(&path), Err(ConfigError::Parse(_)));
    }
}
