//! Reconciler CLI
//!
//! Command-line interface for submitting blueprints and inspecting them

use clap::{Parser, Subcommand};
use reconciler_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "reconcile")]
#[command(about = "Blueprint reconciler - desired state for an ecosystem", long_about = None)]
struct Cli {
    /// Logging profile: development, production or test
    #[arg(long, global = true, default_value = "development")]
    log_profile: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Store a blueprint for reconciliation
    Submit(commands::submit::SubmitArgs),
    /// Show one stored blueprint, or list all of them
    Status(commands::status::StatusArgs),
    /// Diff a blueprint against an ecosystem description, offline
    Plan(commands::plan::PlanArgs),
    /// Print the effective reconciler configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init(cli.log_profile);

    let result = match cli.command {
        Commands::Submit(args) => commands::submit::execute(args).await,
        Commands::Status(args) => commands::status::execute(args).await,
        Commands::Plan(args) => commands::plan::execute(args),
        Commands::Config(args) => commands::config::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
