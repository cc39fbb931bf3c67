use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use barkeep::Config;
use commands::{ApplyCommand, ConfigCommand, DrinksCommand, SeatsCommand};

#[derive(Parser)]
#[command(name = "barkeep")]
#[command(version)]
#[command(about = "Manage a venue's seat and drink options", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage seat options
    Seats(SeatsCommand),

    /// Manage drink options
    Drinks(DrinksCommand),

    /// Apply a venue description from a YAML file
    Apply(ApplyCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "barkeep=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Seats(cmd)) => cmd.run(&config).await?,
        Some(Commands::Drinks(cmd)) => cmd.run(&config).await?,
        Some(Commands::Apply(cmd)) => cmd.run(&config).await?,
        Some(Commands::Config(cmd)) => cmd.run(&config)?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
