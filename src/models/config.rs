//! Configuration models.
//!
//! Two documents live in the config directory:
//! - `media-library.json`: user library settings, edited through the API/CLI.
//! - `settings.toml`: TMDB credentials and server binding.

use crate::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the library configuration document.
pub const LIBRARY_CONFIG_FILE: &str = "media-library.json";

/// File name of the application settings document.
pub const SETTINGS_FILE: &str = "settings.toml";

/// User-level library settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaLibraryConfig {
    /// Library roots, scanned in order.
    pub library_paths: Vec<PathBuf>,
    /// Run scans periodically in the background.
    pub auto_scan: bool,
    /// Minutes between automatic scans.
    pub scan_interval_minutes: u64,
    /// Whether the UI should surface notifications.
    pub enable_notifications: bool,
}

impl Default for MediaLibraryConfig {
    fn default() -> Self {
        Self {
            library_paths: Vec::new(),
            auto_scan: false,
            scan_interval_minutes: 60,
            enable_notifications: true,
        }
    }
}

impl MediaLibraryConfig {
    /// Reject settings the scheduler or scanner cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_minutes == 0 {
            return Err(crate::Error::InvalidConfig(
                "scanIntervalMinutes must be at least 1".to_string(),
            ));
        }
        if let Some(empty) = self.library_paths.iter().find(|p| p.as_os_str().is_empty()) {
            return Err(crate::Error::InvalidConfig(format!(
                "library path must not be empty: {:?}",
                empty
            )));
        }
        Ok(())
    }
}

/// Persistent holder of the library configuration.
///
/// Loaded once, updated explicitly; every update is written to disk before
/// it becomes visible.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<MediaLibraryConfig>,
}

impl ConfigStore {
    /// Load the configuration at `path`, writing defaults if it is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            tracing::info!("Config file not found, creating default at {}", path.display());
            let config = MediaLibraryConfig::default();
            write_json(&path, &config)?;
            config
        };

        Ok(Self {
            path,
            current: RwLock::new(config),
        })
    }

    /// Snapshot of the current configuration.
    pub fn get(&self) -> MediaLibraryConfig {
        self.current.read().clone()
    }

    /// Validate, persist and apply a new configuration.
    pub fn update(&self, config: MediaLibraryConfig) -> Result<()> {
        config.validate()?;
        let mut current = self.current.write();
        write_json(&self.path, &config)?;
        *current = config;
        tracing::info!("Library configuration saved to {}", self.path.display());
        Ok(())
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_json(path: &Path, config: &MediaLibraryConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Application settings (`settings.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// TMDB configuration.
    pub tmdb: TmdbSettings,
    /// HTTP server configuration.
    pub server: ServerSettings,
}

/// TMDB configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbSettings {
    /// API key (v3) or Bearer token (v4).
    pub api_key: Option<String>,
    /// Language for responses.
    pub language: String,
    /// API root.
    pub api_base_url: String,
    /// Prefix for image paths returned by the API.
    pub image_base_url: String,
}

impl Default for TmdbSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            language: "zh-CN".to_string(),
            api_base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p/original".to_string(),
        }
    }
}

impl TmdbSettings {
    /// Reject credentials the client cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(crate::Error::InvalidConfig(
                "TMDB API key must not be empty".to_string(),
            ));
        }
        if self.api_base_url.trim().is_empty() || self.image_base_url.trim().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "TMDB base URLs must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5080,
        }
    }
}

/// Get the default configuration directory path.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("media_library")
}

/// Load settings from `<dir>/settings.toml`.
///
/// A missing file yields defaults; `TMDB_API_KEY` fills in a missing key.
pub fn load_settings(dir: &Path) -> Result<AppSettings> {
    let path = dir.join(SETTINGS_FILE);
    let mut settings: AppSettings = if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content)?
    } else {
        AppSettings::default()
    };

    if settings.tmdb.api_key.as_deref().map_or(true, str::is_empty) {
        settings.tmdb.api_key = std::env::var("TMDB_API_KEY").ok().filter(|k| !k.is_empty());
    }

    Ok(settings)
}

/// Save settings to `<dir>/settings.toml`.
pub fn save_settings(dir: &Path, settings: &AppSettings) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let content = toml::to_string_pretty(settings)?;
    std::fs::write(dir.join(SETTINGS_FILE), content)?;
    Ok(())
}

/// Live application settings, shared by the API and the TMDB client.
///
/// TMDB credentials can change at runtime; every update is written to
/// `settings.toml` before it becomes visible.
#[derive(Debug)]
pub struct SettingsStore {
    dir: PathBuf,
    current: RwLock<AppSettings>,
}

impl SettingsStore {
    /// Wrap already-loaded settings backed by `<dir>/settings.toml`.
    pub fn new(dir: impl Into<PathBuf>, settings: AppSettings) -> Self {
        Self {
            dir: dir.into(),
            current: RwLock::new(settings),
        }
    }

    /// Load settings from `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let settings = load_settings(&dir)?;
        Ok(Self::new(dir, settings))
    }

    pub fn get(&self) -> AppSettings {
        self.current.read().clone()
    }

    pub fn tmdb(&self) -> TmdbSettings {
        self.current.read().tmdb.clone()
    }

    /// Validate, persist and apply new TMDB settings.
    pub fn update_tmdb(&self, tmdb: TmdbSettings) -> Result<()> {
        tmdb.validate()?;
        let mut current = self.current.write();
        let mut next = current.clone();
        next.tmdb = tmdb;
        save_settings(&self.dir, &next)?;
        *current = next;
        tracing::info!("TMDB settings saved to {}", self.dir.join(SETTINGS_FILE).display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(LIBRARY_CONFIG_FILE);

        let store = ConfigStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.get(), MediaLibraryConfig::default());
    }

    #[test]
    fn test_update_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LIBRARY_CONFIG_FILE);
        let store = ConfigStore::open(&path).unwrap();

        let config = MediaLibraryConfig {
            library_paths: vec![PathBuf::from("/movies")],
            auto_scan: true,
            scan_interval_minutes: 15,
            enable_notifications: false,
        };
        store.update(config.clone()).unwrap();

        let reopened = ConfigStore::open(&path).unwrap();
        assert_eq!(reopened.get(), config);
    }

    #[test]
    fn test_update_rejects_zero_interval() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::open(dir.path().join(LIBRARY_CONFIG_FILE)).unwrap();

        let config = MediaLibraryConfig {
            scan_interval_minutes: 0,
            ..Default::default()
        };
        assert!(store.update(config).is_err());
        assert_eq!(store.get().scan_interval_minutes, 60);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: MediaLibraryConfig =
            serde_json::from_str(r#"{"libraryPaths": ["/a", "/b"]}"#).unwrap();
        assert_eq!(config.library_paths.len(), 2);
        assert_eq!(config.scan_interval_minutes, 60);
        assert!(config.enable_notifications);
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut settings = AppSettings::default();
        settings.tmdb.api_key = Some("abc".to_string());
        settings.server.port = 9000;
        save_settings(dir.path(), &settings).unwrap();

        let loaded = load_settings(dir.path()).unwrap();
        assert_eq!(loaded.tmdb.api_key.as_deref(), Some("abc"));
        assert_eq!(loaded.server.port, 9000);
        assert_eq!(loaded.tmdb.language, "zh-CN");
    }

    #[test]
    fn test_update_tmdb_persists() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path(), AppSettings::default());

        let tmdb = TmdbSettings {
            api_key: Some("new-key".to_string()),
            language: "en-US".to_string(),
            ..Default::default()
        };
        store.update_tmdb(tmdb).unwrap();

        assert_eq!(store.tmdb().api_key.as_deref(), Some("new-key"));
        let loaded = load_settings(dir.path()).unwrap();
        assert_eq!(loaded.tmdb.api_key.as_deref(), Some("new-key"));
        assert_eq!(loaded.tmdb.language, "en-US");
    }

    #[test]
    fn test_update_tmdb_rejects_empty_key() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path(), AppSettings::default());

        let tmdb = TmdbSettings {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_tmdb(tmdb),
            Err(crate::Error::InvalidConfig(_))
        ));
        assert!(!dir.path().join(SETTINGS_FILE).exists());
    }
}
