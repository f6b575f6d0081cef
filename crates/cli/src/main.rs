//! ResGenie CLI: the main entry point.
//!
//! Commands:
//! - `ask`     : Single question or interactive staffing search
//! - `vocab`   : Print known regions, ranks and skills
//! - `doctor`  : Diagnose config, API key and data file
//! - `onboard` : Write a default config

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "resgenie",
    about = "ResGenie — natural-language staffing search",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a staffing question
    Ask {
        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show the regions, rank hierarchy and skills the resolver knows
    Vocab,

    /// Diagnose configuration and data health
    Doctor,

    /// Initialize configuration
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask { message } => commands::ask::run(message).await?,
        Commands::Vocab => commands::vocab::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
