//! Command line configuration

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cli::observability::LoggingConfig;

pub(crate) mod logging;
pub(crate) mod observability;

/// BOGO offer administration and checkout simulation
#[derive(Debug, Parser)]
#[command(name = "bogo", about = "Buy One Get One Free offer tools", long_about = None)]
pub(crate) struct CliConfig {
    /// Settings file
    #[arg(short, long, env = "BOGO_SETTINGS", default_value = "./bogo.yml")]
    pub settings: PathBuf,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Show whether the offer is active and what it covers
    Status,

    /// Update the offer settings
    Configure(ConfigureArgs),

    /// Replay a fixture shopping session and print the resulting order
    Simulate(SimulateArgs),
}

/// Settings page fields; omitted fields keep their saved value.
#[derive(Debug, Args)]
pub(crate) struct ConfigureArgs {
    /// Enable the offer ("yes" enables, anything else disables)
    #[arg(long)]
    pub enabled: Option<String>,

    /// Offer scope ("all" or "selected")
    #[arg(long)]
    pub scope: Option<String>,

    /// Comma-separated product and variation IDs
    #[arg(long)]
    pub products: Option<String>,
}

/// Simulation inputs
#[derive(Debug, Args)]
pub(crate) struct SimulateArgs {
    /// Fixture set name
    pub name: String,

    /// Fixtures directory
    #[arg(long, env = "BOGO_FIXTURES", default_value = "./fixtures")]
    pub fixtures: PathBuf,
}
