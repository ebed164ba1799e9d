use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigCommand, StockCommand, VegetableCommand};
use vegstock::client::ApiClient;
use vegstock::config::Config;

#[derive(Parser)]
#[command(name = "vegstock")]
#[command(version)]
#[command(about = "Manage the vegetable catalog and daily stock", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the vegetable catalog
    Vegetable(VegetableCommand),

    /// Manage daily stock
    Stock(StockCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vegstock=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Vegetable(cmd)) => {
            let client = ApiClient::from_config(&config);
            cmd.run(&client).await?;
        }
        Some(Commands::Stock(cmd)) => {
            let client = ApiClient::from_config(&config);
            cmd.run(&client).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
