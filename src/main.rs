//! Command-line interface for censo-sync
//!
//! # Usage Examples
//!
//! ```bash
//! # Load the default census directory into a local SQLite file
//! censo-sync --database-url sqlite:censo.db
//!
//! # Only create the tables, keeping any that already exist
//! censo-sync --directory ./csv --create-tables-only --skip-existing \
//!   --database-url postgresql://censo@localhost:5432/censo
//!
//! # One file into an explicit table, credentials from the environment
//! CENSO_DATABASE_URL=postgresql://censo@db.example.com/censo \
//! CENSO_AUTH_TOKEN=... \
//! censo-sync --file "Base de Datos de Hogar - Parte 1.csv" --table hogar
//!
//! # Turso, syncing an embedded replica every 500 rows
//! censo-sync --database-url libsql://censo-org.turso.io \
//!   --replica-path censo-replica.db --sync-interval 500
//! ```
//!
//! Variables from a `.env` file in the working directory are loaded before
//! the command line is parsed.

use anyhow::Context;
use censo_sync::connect::connect_destination;
use censo_sync::csv::ImportPlan;
use censo_sync::{import_and_close, Cli};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();
    let config = cli.import_config()?;

    // Resolve the source before touching the destination
    let plan = ImportPlan::build(&config).await?;
    if plan.is_empty() {
        tracing::info!("Nothing to import");
        return Ok(());
    }

    let sink = connect_destination(&cli.destination)
        .await
        .context("Failed to open the destination database")?;

    let report = import_and_close(&*sink, &config, &plan).await?;

    tracing::info!("Import finished: {} files processed", report.files().len());
    Ok(())
}
