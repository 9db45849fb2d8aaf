pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "waiter",
    about = "Waiter operator CLI",
    long_about = "Inspect configuration, check readiness, manage the menu file, and talk to the order engine from a terminal.",
    after_help = "Examples:\n  waiter doctor --json\n  waiter menu --limit 10\n  waiter import scraped.json --output products.json\n  waiter chat --user 42"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a waiter.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, bot token readiness, menu file and agent settings")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the first menu products with raw and parsed prices")]
    Menu {
        #[arg(long, help = "Number of products to show (defaults to menu.display_limit)")]
        limit: Option<usize>,
    },
    #[command(about = "Normalize a raw scraped menu dump into the menu file format")]
    Import {
        #[arg(help = "JSON array of {title, description, price_text} cards")]
        input: PathBuf,
        #[arg(long, default_value = "products.json", help = "Where to write the menu")]
        output: PathBuf,
    },
    #[command(about = "Order interactively from the terminal; /menu, /checkout, /clear, /quit")]
    Chat {
        #[arg(long, default_value = "cli", help = "Session user id")]
        user: String,
    },
}

fn init_logging() {
    // stdout carries command output; diagnostics go to stderr
    let filter = EnvFilter::try_from_env("WAITER_CLI_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
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
        Command::Config => commands::CommandResult::plain(commands::config::run(cli.config)),
        Command::Doctor { json } => {
            let (passed, output) = commands::doctor::run(cli.config, json);
            commands::CommandResult { exit_code: if passed { 0 } else { 1 }, output }
        }
        Command::Menu { limit } => commands::menu::run(cli.config, limit),
        Command::Import { input, output } => commands::import::run(&input, &output),
        Command::Chat { user } => commands::chat::run(cli.config, user),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
