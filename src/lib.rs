//! censo-sync library
//!
//! Loads census CSV files into relational tables, one table per file.
//!
//! # Destinations
//!
//! - SQLite: `sqlite:censo.db`, `sqlite::memory:` or any path ending in
//!   `.db`, `.sqlite` or `.sqlite3`
//! - PostgreSQL: `postgresql://user@host/db`, with the password supplied as an
//!   auth token at runtime
//! - libSQL (Turso): `libsql://db-org.turso.io`, with the auth token required;
//!   `--replica-path` keeps an embedded replica that is synced during the run
//!
//! # CLI Usage
//!
//! ```bash
//! # Every CSV file in a directory, one table per file
//! censo-sync --directory assets/Bases-Finales-CPV2024SV-CSV --database-url sqlite:censo.db
//!
//! # A single file into a named table
//! censo-sync --file poblacion.csv --table censo_poblacion \
//!   --database-url postgresql://censo@localhost/censo --auth-token "$TOKEN"
//!
//! # Into Turso through a local replica
//! censo-sync --database-url libsql://censo-org.turso.io --auth-token "$TOKEN" \
//!   --replica-path censo-replica.db
//! ```

use anyhow::{bail, Result};
use clap::{Args, Parser};
use std::path::PathBuf;
use table_sink::TableSink;
use tracing::warn;

pub mod connect;

// Re-export the CSV crate for convenience
pub use censo_sync_csv_source as csv;

use crate::csv::{Config, ImportMode, ImportPlan, RunReport};

#[derive(Parser, Debug)]
#[command(name = "censo-sync")]
#[command(about = "Load census CSV files into SQLite, PostgreSQL or libSQL tables")]
#[command(long_about = None)]
pub struct Cli {
    /// What to import
    #[command(flatten)]
    pub source: SourceArgs,

    /// How to import it
    #[command(flatten)]
    pub import: ImportOpts,

    /// Where to import it
    #[command(flatten)]
    pub destination: DestinationOpts,
}

#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    /// Directory of census CSV files, one table per file
    #[arg(long, value_name = "DIR", conflicts_with = "file")]
    pub directory: Option<PathBuf>,

    /// Import a single CSV file instead of a directory
    #[arg(long, value_name = "FILE", requires = "table")]
    pub file: Option<PathBuf>,

    /// Target table for --file
    #[arg(long, requires = "file")]
    pub table: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct ImportOpts {
    /// Create the tables without importing any rows
    #[arg(long)]
    pub create_tables_only: bool,

    /// Leave tables that already exist untouched
    #[arg(long)]
    pub skip_existing: bool,

    /// Rows inserted per transaction
    #[arg(long, default_value_t = csv::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Row failures after which a file's import is aborted
    #[arg(long, default_value_t = csv::DEFAULT_MAX_ERRORS)]
    pub max_errors: u64,

    /// Sync with the remote database every this many rows
    #[arg(long, default_value_t = csv::DEFAULT_SYNC_INTERVAL)]
    pub sync_interval: u64,

    /// Prefix for table names derived from file names
    #[arg(long, default_value = csv::naming::DEFAULT_TABLE_PREFIX)]
    pub table_prefix: String,

    /// CSV delimiter character
    #[arg(long, default_value = ",")]
    pub delimiter: char,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Clone, Debug)]
pub struct DestinationOpts {
    /// Destination database URL
    #[arg(long, env = "CENSO_DATABASE_URL")]
    pub database_url: String,

    /// Auth token for the destination (the PostgreSQL password, or the libSQL token)
    #[arg(long, env = "CENSO_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Local embedded replica file for a libSQL destination (needs the
    /// `libsql-replica` build feature)
    #[arg(long, env = "CENSO_REPLICA_PATH", value_name = "FILE")]
    pub replica_path: Option<PathBuf>,
}

impl SourceArgs {
    pub fn mode(&self) -> ImportMode {
        match &self.file {
            Some(path) => ImportMode::File {
                path: path.clone(),
                table: self.table.clone(),
            },
            None => ImportMode::Directory(
                self.directory
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(csv::DEFAULT_CSV_DIR)),
            ),
        }
    }
}

impl Cli {
    /// Build and validate the import configuration.
    pub fn import_config(&self) -> Result<Config> {
        if !self.import.delimiter.is_ascii() {
            bail!(
                "Delimiter must be a single ASCII character, got {:?}",
                self.import.delimiter
            );
        }

        let config = Config {
            mode: self.source.mode(),
            batch_size: self.import.batch_size,
            max_errors: self.import.max_errors,
            sync_interval: self.import.sync_interval,
            table_prefix: self.import.table_prefix.clone(),
            delimiter: self.import.delimiter as u8,
            create_tables_only: self.import.create_tables_only,
            skip_existing: self.import.skip_existing,
            show_progress: !self.import.no_progress,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}

/// Run a planned import and close the sink afterwards, whatever the result.
pub async fn import_and_close<S>(sink: &S, config: &Config, plan: &ImportPlan) -> Result<RunReport>
where
    S: TableSink + ?Sized,
{
    let result = csv::sync(sink, config, plan).await;

    if let Err(e) = sink.close().await {
        warn!("Failed to close the destination connection: {e:#}");
    }

    result
}
