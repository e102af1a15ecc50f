//! CLI command implementations.

pub mod config;
pub mod process;
pub mod scan;
pub mod serve;

use crate::core::coordinator::ScanCoordinator;
use crate::core::store::MediaRecordStore;
use crate::models::config::{AppSettings, ConfigStore, SettingsStore, LIBRARY_CONFIG_FILE};
use crate::services::metadata::TmdbMetadataClient;
use crate::services::notifier::NotificationSink;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Open `media-library.json` in the config directory.
pub fn open_config(config_dir: &Path) -> Result<Arc<ConfigStore>> {
    let path = config_dir.join(LIBRARY_CONFIG_FILE);
    let store = ConfigStore::open(&path)
        .with_context(|| format!("Failed to load library configuration from {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Live settings backed by `settings.toml` in the config directory.
pub fn shared_settings(config_dir: &Path, settings: &AppSettings) -> Arc<SettingsStore> {
    Arc::new(SettingsStore::new(config_dir, settings.clone()))
}

/// Wire up a coordinator backed by TMDB.
pub fn build_coordinator(config_dir: &Path, settings: &Arc<SettingsStore>) -> Result<Arc<ScanCoordinator>> {
    let config = open_config(config_dir)?;

    Ok(Arc::new(ScanCoordinator::new(
        Arc::new(MediaRecordStore::new()),
        Arc::new(NotificationSink::new()),
        Arc::new(TmdbMetadataClient::new(Arc::clone(settings))),
        config,
    )))
}
