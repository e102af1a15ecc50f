//! Serve command implementation.

use super::{build_coordinator, shared_settings};
use crate::core::scheduler::run_auto_scan;
use crate::models::config::AppSettings;
use crate::server::{self, AppContext};
use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run the API server and the auto-scan scheduler until Ctrl-C.
pub async fn serve(
    config_dir: &Path,
    settings: &AppSettings,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid server address: {}:{}", host, port))?;

    let settings = shared_settings(config_dir, settings);
    let coordinator = build_coordinator(config_dir, &settings)?;

    println!("{}", "[SERVE] Initializing media library...".bold().cyan());
    let count = coordinator.initialize().await;
    println!("  Known files: {}", count);
    println!("  Config: {}", coordinator.config().path().display());
    println!("  API: http://{}/api/medialibrary", addr);
    if settings.tmdb().api_key.is_none() {
        println!(
            "  {} TMDB API key not set; configure it at http://{}/api/settings/tmdb",
            "[WARN]".yellow(),
            addr
        );
    }
    println!();

    let cancel = CancellationToken::new();

    let scheduler = tokio::spawn(run_auto_scan(Arc::clone(&coordinator), cancel.clone()));

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        signal_cancel.cancel();
    });

    let ctx = AppContext::new(Arc::clone(&coordinator), settings);
    let result = server::serve(ctx, addr, cancel.clone()).await;

    cancel.cancel();
    coordinator.shutdown();
    let _ = scheduler.await;

    result.with_context(|| format!("Server on {} failed", addr))
}
