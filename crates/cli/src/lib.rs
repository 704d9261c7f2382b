pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "horizon",
    about = "Open Horizon operator CLI",
    long_about = "Run the interactive Erasmus+ assistant menu, manage the database, and inspect configuration.",
    after_help = "Examples:\n  horizon menu\n  horizon seed\n  horizon doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Open the numbered menu: brainstorm, partners, application, chat, help")]
    Menu {
        #[arg(long, default_value = "local-user", help = "User id that owns created projects")]
        user: String,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the partner catalog and knowledge base samples (idempotent)")]
    Seed,
    #[command(about = "Delete partner searches and sessions past their retention window")]
    Prune,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM settings, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Menu { user } => commands::menu::run(&user),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Prune => commands::prune::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
