//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Plume CLI - inspect rate limit dispatch for social platforms
#[derive(Parser, Debug)]
#[command(name = "plume")]
#[command(about = "Rate-limited dispatch for social platform APIs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Load configuration from this file instead of the default locations
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the effective dispatcher configuration
    Config {
        /// Only show this platform (twitter, meta, or a configured name)
        #[arg(short, long)]
        platform: Option<String>,
    },

    /// Build the dispatchers and print their quota snapshots
    Status {
        /// Print snapshots as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_with_platform() {
        let cli = Cli::try_parse_from(["plume", "config", "--platform", "meta"]).unwrap();
        match cli.command {
            Commands::Config { platform } => assert_eq!(platform.as_deref(), Some("meta")),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["plume", "status", "--json", "-v", "--config", "custom.toml"])
                .unwrap();
        assert!(matches!(cli.command, Commands::Status { json: true }));
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["plume"]).is_err());
    }
}
