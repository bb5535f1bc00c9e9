//! Per-file import sessions and the results they produce.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Counters for one file's import. Created when streaming starts and
/// dropped when the file is done.
#[derive(Debug)]
pub struct ImportSession {
    table: String,
    max_errors: u64,
    started: Instant,
    /// Data rows read from the file
    pub rows_read: u64,
    /// Rows committed to the destination
    pub rows_inserted: u64,
    /// Row-level failures, counted against the ceiling
    pub errors: u64,
    /// Batches that failed as a whole and were retried row by row
    pub failed_batches: u64,
}

impl ImportSession {
    pub fn new(table: impl Into<String>, max_errors: u64) -> Self {
        Self {
            table: table.into(),
            max_errors,
            started: Instant::now(),
            rows_read: 0,
            rows_inserted: 0,
            errors: 0,
            failed_batches: 0,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Count one row failure. Returns true once the ceiling is reached.
    pub fn record_error(&mut self) -> bool {
        self.errors += 1;
        self.ceiling_reached()
    }

    pub fn ceiling_reached(&self) -> bool {
        self.errors >= self.max_errors
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            table: self.table.clone(),
            rows_read: self.rows_read,
            rows_inserted: self.rows_inserted,
            errors: self.errors,
            failed_batches: self.failed_batches,
            rows_in_table: None,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Final counters of a file that reached streaming.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub table: String,
    pub rows_read: u64,
    pub rows_inserted: u64,
    pub errors: u64,
    pub failed_batches: u64,
    /// Row count read back from the destination once streaming ended
    pub rows_in_table: Option<u64>,
    pub elapsed: Duration,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} rows | {:.2} seconds | {} errors",
            self.table,
            self.rows_read,
            self.elapsed.as_secs_f64(),
            self.errors
        )
    }
}

/// Why a file was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The table exists and skip-existing is on.
    TableExists,
    /// An earlier file in the same run already maps to this table.
    NameCollision { previous: PathBuf },
}

/// Result of processing one source file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Every row was read; failed rows stayed under the ceiling.
    Completed(ImportSummary),
    /// The error ceiling was reached and reading stopped early.
    Aborted(ImportSummary),
    /// The table was created and no data loaded.
    SchemaOnly { table: String, columns: usize },
    Skipped { table: String, reason: SkipReason },
    /// The file could not be opened or its header could not be read.
    Failed { table: String, reason: String },
}

impl FileOutcome {
    pub fn table(&self) -> &str {
        match self {
            FileOutcome::Completed(s) | FileOutcome::Aborted(s) => &s.table,
            FileOutcome::SchemaOnly { table, .. }
            | FileOutcome::Skipped { table, .. }
            | FileOutcome::Failed { table, .. } => table,
        }
    }

    pub fn summary(&self) -> Option<&ImportSummary> {
        match self {
            FileOutcome::Completed(s) | FileOutcome::Aborted(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, FileOutcome::Completed(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, FileOutcome::Aborted(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// Outcomes of every file in a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    files: Vec<FileReport>,
}

impl RunReport {
    pub fn push(&mut self, path: impl Into<PathBuf>, outcome: FileOutcome) {
        self.files.push(FileReport {
            path: path.into(),
            outcome,
        });
    }

    pub fn files(&self) -> &[FileReport] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn outcome_for(&self, path: &Path) -> Option<&FileOutcome> {
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| &f.outcome)
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }

    pub fn log_summary(&self) {
        if self.files.is_empty() {
            info!("No files were processed");
            return;
        }

        let rows: u64 = self
            .files
            .iter()
            .filter_map(|f| f.outcome.summary())
            .map(|s| s.rows_inserted)
            .sum();

        info!(
            "Processed {} files: {} completed, {} aborted, {} schema only, {} skipped, {} failed ({rows} rows inserted)",
            self.files.len(),
            self.count(FileOutcome::is_completed),
            self.count(FileOutcome::is_aborted),
            self.count(|o| matches!(o, FileOutcome::SchemaOnly { .. })),
            self.count(|o| matches!(o, FileOutcome::Skipped { .. })),
            self.count(|o| matches!(o, FileOutcome::Failed { .. })),
        );
    }
}
