//! CLI module for greenwave
//!
//! Provides commands:
//! - `run`: Run the scheduler (default)
//! - `plan`: Print the next planned instant of every configured job
//! - `check`: Validate configuration and job definitions

use clap::{Parser, Subcommand};

pub mod check;
pub mod plan;

/// Carbon-aware job scheduler
#[derive(Parser, Debug)]
#[command(name = "greenwave")]
#[command(about = "Runs jobs when the grid is greenest")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler (default)
    Run,
    /// Show when each configured job would run next
    Plan,
    /// Validate configuration and job definitions
    Check,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Plan) => plan::run().await,
        Some(Commands::Check) => check::run(),
        Some(Commands::Run) | None => crate::server::run().await,
    }
}
