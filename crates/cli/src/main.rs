//! AIStyleHub CLI - Database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! stylehub migrate
//!
//! # Load the demo catalog
//! stylehub seed --file crates/cli/data/catalog.yaml
//!
//! # Wipe outfits, products and shops first
//! stylehub seed --file crates/cli/data/catalog.yaml --reset
//! ```
//!
//! # Environment Variables
//!
//! - `STYLEHUB_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "stylehub")]
#[command(author, version, about = "AIStyleHub CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed shops and products from a YAML catalog
    Seed {
        /// Path to the catalog file
        #[arg(short, long, default_value = "crates/cli/data/catalog.yaml")]
        file: PathBuf,

        /// Delete existing outfits, products and shops first
        #[arg(long)]
        reset: bool,
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
        Commands::Seed { file, reset } => commands::seed::run(&file, reset).await?,
    }
    Ok(())
}
