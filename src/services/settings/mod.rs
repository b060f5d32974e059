//! Settings persistence.
//! Reads and writes `settings.toml` in the platform config directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;

use crate::models::settings::Settings;

const SETTINGS_FILE: &str = "settings.toml";

pub struct SettingsService {
    path: PathBuf,
}

impl SettingsService {
    /// Service bound to the platform config directory
    pub fn new() -> Result<Self> {
        let dirs = project_dirs()?;
        Ok(Self::with_path(dirs.config_dir().join(SETTINGS_FILE)))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings; a missing file yields defaults
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            log::info!("No settings at {:?}, using defaults", self.path);
            return Ok(Settings::default());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {:?}", self.path))?;
        let settings: Settings = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse settings at {:?}", self.path))?;
        settings
            .validate()
            .map_err(|e| anyhow!("Invalid settings: {}", e))?;

        Ok(settings)
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        settings
            .validate()
            .map_err(|e| anyhow!("Invalid settings: {}", e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }

        let raw = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write settings to {:?}", self.path))?;
        Ok(())
    }
}

/// Default database location, next to the settings file's data dir
pub fn default_database_path() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;
    Ok(data_dir.join("meetings.db"))
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "KenBoyle", "MeetingGrid")
        .ok_or_else(|| anyhow!("Could not determine a home directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = SettingsService::with_path(dir.path().join("settings.toml"));
        assert_eq!(service.load().unwrap(), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let service = SettingsService::with_path(dir.path().join("nested").join("settings.toml"));

        let settings = Settings {
            debounce_ms: 250,
            timezone: "Europe/Berlin".to_string(),
            visible_days: 5,
            ..Settings::default()
        };
        service.save(&settings).unwrap();

        assert_eq!(service.load().unwrap(), settings);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "hour_height = -3.0").unwrap();

        let service = SettingsService::with_path(&path);
        assert!(service.load().is_err());
    }

    #[test]
    fn test_save_rejects_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let service = SettingsService::with_path(dir.path().join("settings.toml"));
        let settings = Settings {
            timezone: "Nowhere/Special".to_string(),
            ..Settings::default()
        };
        assert!(service.save(&settings).is_err());
        assert!(!service.path().exists());
    }
}
