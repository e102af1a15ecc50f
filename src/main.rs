//! Media Library CLI
//!
//! Scans video folders and enriches them with TMDB metadata, artwork and NFO files.

use clap::Parser;
use media_library::cli::{
    args::{Cli, Commands},
    commands::{config, open_config, process, scan, serve},
};
use media_library::models::config::{default_config_dir, load_settings, AppSettings};
use media_library::preflight;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let config_dir = cli.config_dir.clone().unwrap_or_else(default_config_dir);
    let settings = load_settings(&config_dir)?;

    // Run the appropriate command
    match cli.command {
        Commands::Serve { host, port } => {
            if !cli.skip_preflight {
                run_preflight_checks(&config_dir, &settings).await?;
            }
            serve::serve(&config_dir, &settings, host, port).await?;
        }

        Commands::Scan => {
            if !cli.skip_preflight {
                run_preflight_checks(&config_dir, &settings).await?;
            }
            scan::scan(&config_dir, &settings).await?;
        }

        Commands::Process { file } => {
            if !cli.skip_preflight {
                run_preflight_checks(&config_dir, &settings).await?;
            }
            process::process(&config_dir, &settings, &file).await?;
        }

        Commands::Config { action } => {
            config::execute_config(&config_dir, action)?;
        }
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "media_library=debug,tower_http=debug"
    } else {
        "media_library=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

/// Run preflight checks and exit if any fail.
async fn run_preflight_checks(config_dir: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    use colored::Colorize;

    println!("{}", "Running preflight checks...".bold());
    println!();

    let library = open_config(config_dir)?.get();
    let results = preflight::run_preflight_checks(settings, &library).await?;
    preflight::print_results(&results);

    println!();

    if !preflight::all_passed(&results) {
        anyhow::bail!("Preflight checks failed. Fix the issues above and try again.");
    }

    Ok(())
}
