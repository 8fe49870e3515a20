//! Configuration Management
//!
//! Handles persistent user preferences for restui. The admin configuration
//! itself lives in [`crate::config_store`].

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TOAST_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Last location (`/page?query`)
    #[serde(default)]
    pub last_location: Option<String>,
    /// Last configuration file or object url
    #[serde(default)]
    pub config_source: Option<String>,
    /// How long toasts stay visible
    #[serde(default)]
    pub toast_duration_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// minimal, detailed or verbose
    #[serde(default)]
    pub notification_detail: Option<String>,
}

impl Config {
    /// Directory holding preferences and logs
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("restui"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from a specific file; missing or broken files give defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_secs(self.toast_duration_secs.unwrap_or(DEFAULT_TOAST_SECS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Effective start location (CLI > config > first page)
    pub fn effective_location(&self, cli: Option<&str>, first_page: &str) -> String {
        cli.map(str::to_string)
            .or_else(|| self.last_location.clone())
            .unwrap_or_else(|| format!("/{}", first_page))
    }

    /// Set last location and save
    pub fn set_last_location(&mut self, location: &str) -> Result<()> {
        if self.last_location.as_deref() == Some(location) {
            return Ok(());
        }
        self.last_location = Some(location.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            last_location: Some("/posts?_page=2".to_string()),
            toast_duration_secs: Some(3),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.toast_duration(), Duration::from_secs(3));
    }

    #[test]
    fn test_broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_effective_location() {
        let config = Config {
            last_location: Some("/users".to_string()),
            ..Default::default()
        };
        assert_eq!(config.effective_location(Some("/posts"), "users"), "/posts");
        assert_eq!(config.effective_location(None, "photos"), "/users");
        assert_eq!(Config::default().effective_location(None, "photos"), "/photos");
        assert_eq!(Config::default().request_timeout(), Duration::from_secs(30));
    }
}
