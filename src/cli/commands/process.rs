//! Process command implementation.

use super::{build_coordinator, shared_settings};
use super::scan::print_records;
use crate::core::coordinator::PipelineOutcome;
use crate::models::config::AppSettings;
use anyhow::{bail, Result};
use colored::Colorize;
use std::path::Path;

/// Run the enrichment pipeline for one file.
pub async fn process(config_dir: &Path, settings: &AppSettings, file: &Path) -> Result<()> {
    if !file.is_file() {
        bail!("File not found: {}", file.display());
    }
    let file = std::fs::canonicalize(file)?;

    let coordinator = build_coordinator(config_dir, &shared_settings(config_dir, settings))?;

    println!("{} {}", "[PROCESS]".bold().cyan(), file.display());
    let outcome = coordinator.process_single_file(&file).await;

    let label = match outcome {
        PipelineOutcome::Completed => "completed".green(),
        PipelineOutcome::UpToDate => "already up to date".green(),
        PipelineOutcome::Failed => "failed".red(),
        PipelineOutcome::Cancelled => "cancelled".yellow(),
        PipelineOutcome::InFlight => "already being processed".yellow(),
        PipelineOutcome::Missing => "file disappeared".yellow(),
    };
    println!("  Result: {}", label);
    println!();

    if let Some(record) = coordinator.store().get(&file) {
        print_records(std::slice::from_ref(&record));
    }

    if outcome == PipelineOutcome::Failed {
        bail!("Processing failed for {}", file.display());
    }
    Ok(())
}
