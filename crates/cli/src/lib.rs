pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "tripxl",
    about = "TripXL operator CLI",
    long_about = "Operate the TripXL booking backend: migrations, demo data, config inspection, readiness checks and fuel price sync.",
    after_help = "Examples:\n  tripxl doctor --json\n  tripxl seed\n  tripxl fuel-sync --dry-run"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo fleet dataset (employees, workflows, vehicles, fuel prices)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, provider keys and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Scrape the latest fuel price announcement and publish it to the API")]
    FuelSync {
        #[arg(long, help = "Extract prices without posting them")]
        dry_run: bool,
    },
}

/// Diagnostics go to stderr so command payloads on stdout stay parseable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::FuelSync { dry_run } => commands::fuel_sync::run(dry_run),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
