//! Packhouse CLI - Database migrations and seeding tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! packhouse migrate
//!
//! # Seed catalog data from a YAML file
//! packhouse seed -f seeds/catalog.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the catalog (states, locations, products, stock, customers)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "packhouse")]
#[command(author, version, about = "Packhouse CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed catalog data from a YAML file
    Seed {
        /// Path to the YAML seed file
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
    }
    Ok(())
}
