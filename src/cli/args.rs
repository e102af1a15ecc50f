//! Command line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Media Library - Scan video folders and enrich them with TMDB metadata
#[derive(Parser, Debug)]
#[command(name = "media-library")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip preflight checks
    #[arg(long, global = true)]
    pub skip_preflight: bool,

    /// Configuration directory (defaults to the user config dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API with background auto-scan
    Serve {
        /// Address to bind (overrides settings.toml)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides settings.toml)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Scan all library paths once in the foreground
    Scan,

    /// Enrich a single video file
    Process {
        /// Path to the video file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Show or change the library configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,

    /// Add a library path
    AddPath {
        /// Directory containing videos
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Remove a library path
    RemovePath {
        /// Previously added directory
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Change scan settings
    Set {
        /// Enable or disable periodic scans
        #[arg(long)]
        auto_scan: Option<bool>,

        /// Minutes between periodic scans
        #[arg(long, value_name = "MINUTES")]
        interval: Option<u64>,

        /// Enable or disable UI notifications
        #[arg(long)]
        notifications: Option<bool>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::parse_from([
            "media-library",
            "--config-dir",
            "/tmp/ml",
            "config",
            "set",
            "--auto-scan",
            "true",
            "--interval",
            "30",
        ]);
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/ml")));
        match cli.command {
            Commands::Config {
                action:
                    ConfigAction::Set {
                        auto_scan,
                        interval,
                        notifications,
                    },
            } => {
                assert_eq!(auto_scan, Some(true));
                assert_eq!(interval, Some(30));
                assert_eq!(notifications, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
