//! Scan command implementation.

use super::{build_coordinator, shared_settings};
use crate::core::coordinator::{ScanCoordinator, ScanOutcome, ScanSummary};
use crate::models::config::AppSettings;
use crate::models::media::{MediaRecord, MediaStatus};
use crate::services::notifier::NotificationEvent;
use anyhow::{bail, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Run one full scan in the foreground with live progress.
pub async fn scan(config_dir: &Path, settings: &AppSettings) -> Result<()> {
    let coordinator = build_coordinator(config_dir, &shared_settings(config_dir, settings))?;
    let roots = coordinator.config().get().library_paths;
    if roots.is_empty() {
        bail!("No library paths configured. Add one with `media-library config add-path <PATH>`");
    }

    println!("{}", "[SCAN] Scanning media library...".bold().cyan());
    for root in &roots {
        println!("  Path: {}", root.display());
    }
    println!();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Discovering files...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let mut rx = coordinator.sink().subscribe();
    let progress = pb.clone();
    let listener = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                NotificationEvent::FileStatus(record) => {
                    progress.set_message(format!("{} [{}]", record.file_name, record.status));
                }
                NotificationEvent::Error(notice) => {
                    progress.println(format!("{} {}", "[WARN]".yellow(), notice.message));
                }
                NotificationEvent::ScanStatus(_) => {}
            }
        }
    });

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let summary = scan_with_interrupt(&coordinator, ctrl_c).await;
    listener.abort();
    pb.finish_and_clear();

    let headline = match summary.outcome {
        ScanOutcome::Finished => "[SCAN] Complete!".bold().green(),
        ScanOutcome::Cancelled => "[SCAN] Cancelled".bold().yellow(),
        ScanOutcome::Failed => "[SCAN] Failed".bold().red(),
        ScanOutcome::AlreadyRunning => "[SCAN] Already running".bold().yellow(),
    };
    println!("{}", headline);
    println!("  Discovered: {}", summary.discovered);
    println!("  Enriched: {}", summary.completed);
    println!("  Up to date: {}", summary.up_to_date);
    println!("  Failed: {}", summary.failed);
    if summary.skipped > 0 {
        println!("  Skipped: {}", summary.skipped);
    }
    println!();

    print_records(&coordinator.store().all());

    if summary.outcome == ScanOutcome::Failed {
        bail!("Scan failed");
    }
    Ok(())
}

/// Run a full scan, cancelling it cleanly once `interrupt` resolves.
pub async fn scan_with_interrupt<F>(coordinator: &Arc<ScanCoordinator>, interrupt: F) -> ScanSummary
where
    F: Future<Output = ()> + Send + 'static,
{
    let target = Arc::clone(coordinator);
    let watcher = tokio::spawn(async move {
        interrupt.await;
        tracing::info!("Interrupt received, cancelling scan");
        target.cancel_scan();
    });

    let summary = coordinator.start_scan().await;
    watcher.abort();
    summary
}

/// Print records as a table.
pub fn print_records(records: &[MediaRecord]) {
    if records.is_empty() {
        println!("No media files found.");
        return;
    }

    println!(
        "{:<12} {:<40} {:<6} {}",
        "Status".bold(),
        "Title".bold(),
        "Year".bold(),
        "File".bold()
    );
    println!("{}", "-".repeat(100));

    for record in records {
        let status = match record.status {
            MediaStatus::Completed => format!("{:<12}", record.status).green(),
            MediaStatus::Error => format!("{:<12}", record.status).red(),
            status if status.is_active() => format!("{:<12}", record.status).yellow(),
            _ => format!("{:<12}", record.status).normal(),
        };
        let title = record.title.as_deref().unwrap_or("-");
        let year = record
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{} {:<40} {:<6} {}", status, title, year, record.file_name);

        if let Some(ref message) = record.error_message {
            println!("             {} {}", "->".red(), message);
        }
    }
}
