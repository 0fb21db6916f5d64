//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the plume binary.

mod commands;
mod config;
mod status;

pub use commands::{Cli, Commands};
pub use config::{load_config, show_config};
pub use status::show_status;
