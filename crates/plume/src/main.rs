//! Plume CLI binary.
//!
//! This binary provides command-line access to Plume's configuration:
//! - Print effective per-platform dispatcher settings
//! - Show quota snapshots for the configured dispatchers

use clap::Parser;
use plume::{ObservabilityConfig, init_observability_with_config};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, load_config, show_config, show_status};

    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize tracing
    let mut observability = ObservabilityConfig::new("plume").with_json_logs(cli.json_logs);
    if cli.verbose {
        observability = observability.with_log_level("debug");
    }
    init_observability_with_config(observability)?;

    let config = load_config(cli.config.as_deref())?;

    // Execute the requested command
    match cli.command {
        Commands::Config { platform } => {
            show_config(&config, platform.as_deref())?;
        }

        Commands::Status { json } => {
            show_status(&config, json).await?;
        }
    }

    Ok(())
}
