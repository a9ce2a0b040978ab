//! keysync: keep a shared keypad code in step with the booking calendar.
//!
//! # Usage
//!
//! ```text
//! keysync init
//! keysync check [--config <path>] [--json]
//! keysync plan [<apartment>] [--config <path>] [--at <datetime>] [--json]
//! keysync run [--config <path>] [--at <datetime>] [--dry-run] [--json] [--report-out <path>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, init::InitArgs, plan::PlanArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "keysync",
    version,
    about = "Sync guest keypad codes on smart locks with the booking calendar",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter config to ~/.keysync/config.yaml.
    Init(InitArgs),

    /// Validate the config and list the configured apartments.
    Check(CheckArgs),

    /// Show the desired code window per apartment without touching any lock.
    Plan(PlanArgs),

    /// Reconcile every lock once and print the report.
    Run(RunArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Check(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Run(args) => args.run(),
    }
}
