//! Import configuration.

use crate::error::ImportError;
use crate::naming::DEFAULT_TABLE_PREFIX;
use censo_sync_file::DEFAULT_BUFFER_SIZE;
use std::path::PathBuf;

/// Directory scanned when none is given.
pub const DEFAULT_CSV_DIR: &str = "assets/Bases-Finales-CPV2024SV-CSV";

/// Rows buffered per INSERT transaction.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Row failures tolerated per file before its import is aborted.
pub const DEFAULT_MAX_ERRORS: u64 = 100;

/// Rows read between remote synchronizations.
pub const DEFAULT_SYNC_INTERVAL: u64 = 1000;

/// What to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportMode {
    /// Every `.csv` file directly inside a directory, one table per file.
    Directory(PathBuf),
    /// One file into an explicitly named table.
    File {
        path: PathBuf,
        table: Option<String>,
    },
}

/// Configuration for CSV import
#[derive(Debug, Clone)]
pub struct Config {
    /// Source of the files to import
    pub mode: ImportMode,

    /// Number of rows to insert in each transaction
    pub batch_size: usize,

    /// Row failures after which a file's import stops
    pub max_errors: u64,

    /// Sync with the remote database every this many rows
    pub sync_interval: u64,

    /// Prefix for table names derived from file names
    pub table_prefix: String,

    /// CSV delimiter character (default: ',')
    pub delimiter: u8,

    /// Create tables without importing any rows
    pub create_tables_only: bool,

    /// Leave existing tables untouched instead of recreating them
    pub skip_existing: bool,

    /// Draw a byte progress bar while importing
    pub show_progress: bool,

    /// Read buffer size for source files
    pub buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ImportMode::Directory(PathBuf::from(DEFAULT_CSV_DIR)),
            batch_size: DEFAULT_BATCH_SIZE,
            max_errors: DEFAULT_MAX_ERRORS,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            delimiter: b',',
            create_tables_only: false,
            skip_existing: false,
            show_progress: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Check the configuration before any resource is opened.
    pub fn validate(&self) -> Result<(), ImportError> {
        if let ImportMode::File { table, .. } = &self.mode {
            if table.as_deref().map(str::trim).unwrap_or_default().is_empty() {
                return Err(ImportError::MissingTable);
            }
        }
        if self.batch_size == 0 {
            return Err(ImportError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.max_errors == 0 {
            return Err(ImportError::InvalidConfig(
                "error ceiling must be at least 1".to_string(),
            ));
        }
        if self.sync_interval == 0 {
            return Err(ImportError::InvalidConfig(
                "sync interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
