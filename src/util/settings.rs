use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;
use tracing::warn;

use crate::infra::recipes::{DEFAULT_BASE_URL, DEFAULT_TTL};
use crate::util::format::DEFAULT_THOUSANDS_SEPARATOR;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "CraftProfit";
const APP_NAME: &str = "CraftProfitCalculator";

/// Overrides the configured API base URL.
pub const API_URL_ENV: &str = "CRAFT_API_URL";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    /// How long the recipe listing is served from memory.
    pub listing_ttl_secs: u64,
    pub thousands_separator: char,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            listing_ttl_secs: DEFAULT_TTL.as_secs(),
            thousands_separator: DEFAULT_THOUSANDS_SEPARATOR,
        }
    }
}

impl Settings {
    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    /// Apply environment overrides on top of the stored values.
    pub fn with_env(self) -> Self {
        self.with_api_url(std::env::var(API_URL_ENV).ok().as_deref())
    }

    /// Replace the API base URL unless `url` is missing or blank.
    pub fn with_api_url(mut self, url: Option<&str>) -> Self {
        if let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) {
            self.api_base_url = url.to_string();
        }
        self
    }
}

pub fn settings_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

/// Stored settings plus environment overrides. Falls back to defaults when
/// the file is missing or unreadable.
pub fn load_settings() -> Settings {
    stored_settings().with_env()
}

/// Settings as written in the settings file, without overrides.
pub fn stored_settings() -> Settings {
    settings_file()
        .map(|path| load_settings_from(&path))
        .unwrap_or_default()
}

pub fn load_settings_from(path: &Path) -> Settings {
    let Ok(data) = fs::read_to_string(path) else {
        return Settings::default();
    };
    match serde_json::from_str(&data) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(path = %path.display(), %err, "ignoring unreadable settings file");
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings) -> Result<PathBuf, SettingsError> {
    let path = settings_file().ok_or(SettingsError::StorageUnavailable)?;
    save_settings_to(settings, &path)?;
    Ok(path)
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}
