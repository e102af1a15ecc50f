//! Config command implementation.

use super::open_config;
use crate::cli::args::ConfigAction;
use crate::models::config::MediaLibraryConfig;
use crate::utils::fs::ensure_directory;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

/// Execute config subcommand.
pub fn execute_config(config_dir: &Path, action: ConfigAction) -> Result<()> {
    let store = open_config(config_dir)?;
    let mut config = store.get();

    match action {
        ConfigAction::Show => {
            print_config(&config);
            println!();
            println!("Config file: {}", store.path().display());
            return Ok(());
        }
        ConfigAction::AddPath { path } => {
            ensure_directory(&path)?;
            let path = std::fs::canonicalize(&path)
                .with_context(|| format!("Failed to resolve {}", path.display()))?;
            if config.library_paths.contains(&path) {
                println!("{} Already configured: {}", "[WARN]".yellow(), path.display());
                return Ok(());
            }
            println!("{} Added {}", "[OK]".green(), path.display());
            config.library_paths.push(path);
        }
        ConfigAction::RemovePath { path } => {
            let canonical = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            let before = config.library_paths.len();
            config
                .library_paths
                .retain(|p| p != &path && p != &canonical);
            if config.library_paths.len() == before {
                anyhow::bail!("Path is not configured: {}", path.display());
            }
            println!("{} Removed {}", "[OK]".green(), path.display());
        }
        ConfigAction::Set {
            auto_scan,
            interval,
            notifications,
        } => {
            if let Some(auto_scan) = auto_scan {
                config.auto_scan = auto_scan;
            }
            if let Some(interval) = interval {
                config.scan_interval_minutes = interval;
            }
            if let Some(notifications) = notifications {
                config.enable_notifications = notifications;
            }
        }
    }

    store.update(config.clone())?;
    print_config(&config);
    Ok(())
}

fn print_config(config: &MediaLibraryConfig) {
    println!("{}", "Media Library Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!("{}", "Library paths:".bold());
    if config.library_paths.is_empty() {
        println!("  (none)");
    }
    for path in &config.library_paths {
        let status = if path.is_dir() {
            "Online".green()
        } else {
            "Offline".red()
        };
        println!("  {} {}", path.display(), status);
    }
    println!("Auto scan: {}", config.auto_scan);
    println!("Scan interval: {} minute(s)", config.scan_interval_minutes);
    println!("Notifications: {}", config.enable_notifications);
}
