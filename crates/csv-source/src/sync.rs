//! CSV import implementation
//!
//! This module streams census CSV files into destination tables, one table
//! per file. Each file goes through the same steps:
//!
//! 1. Read the header row and normalize it into column names.
//! 2. Establish the table: skip it, or drop and recreate it.
//! 3. Stream the data rows in batches, syncing with the remote database every
//!    `sync_interval` rows, until the file ends or the error ceiling is hit.

use crate::batch::BatchWriter;
use crate::config::Config;
use crate::error::ImportError;
use crate::naming::normalize_columns;
use crate::outcome::{FileOutcome, ImportSession, ImportSummary, RunReport, SkipReason};
use crate::plan::ImportPlan;
use crate::progress::ByteProgress;
use crate::row::fit_record;
use anyhow::{bail, Context, Result};
use censo_sync_file::SourceFile;
use csv::StringRecord;
use std::path::Path;
use table_sink::{InsertStatement, TableSink};
use tracing::{debug, error, info, warn};

type CsvReader = csv::Reader<Box<dyn std::io::Read + Send>>;

/// A source file positioned just after its header row.
struct OpenedSource {
    reader: CsvReader,
    columns: Vec<String>,
    size: u64,
}

enum SchemaAction {
    Created,
    Skipped,
}

async fn open_source(path: &Path, config: &Config) -> Result<OpenedSource> {
    let file = SourceFile::from_path(path).await?;
    info!(
        "File size: {:.2} MB",
        file.size() as f64 / (1024.0 * 1024.0)
    );

    let reader = file.open(config.buffer_size).await?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(config.delimiter)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    if headers.is_empty() {
        bail!("CSV file has no header row");
    }

    let columns = normalize_columns(headers.iter());
    debug!("CSV headers/columns: {columns:?}");

    Ok(OpenedSource {
        reader: csv_reader,
        columns,
        size: file.size(),
    })
}

async fn establish_schema<S>(
    sink: &S,
    config: &Config,
    table: &str,
    columns: &[String],
) -> Result<SchemaAction>
where
    S: TableSink + ?Sized,
{
    let exists = match sink.table_exists(table).await {
        Ok(exists) => exists,
        Err(e) => {
            warn!("Could not check whether table {table} exists, assuming it does not: {e:#}");
            false
        }
    };

    if exists && config.skip_existing {
        info!("Table {table} already exists, skipping");
        return Ok(SchemaAction::Skipped);
    }

    if exists {
        match sink.drop_table(table).await {
            Ok(()) => info!("Dropped table {table} to recreate it"),
            Err(e) => warn!("Failed to drop existing table {table}: {e:#}"),
        }
    }

    sink.create_table(table, columns)
        .await
        .map_err(|e| ImportError::CreateTable {
            table: table.to_string(),
            reason: format!("{e:#}"),
        })?;
    info!("Created table {table} with {} columns", columns.len());

    Ok(SchemaAction::Created)
}

async fn sync_remote<S>(sink: &S)
where
    S: TableSink + ?Sized,
{
    if let Err(e) = sink.sync().await {
        warn!("Failed to sync with the remote database: {e:#}");
    }
}

/// Close out a session, reading the table's row count back from the sink.
async fn finish_session<S>(sink: &S, session: &ImportSession) -> ImportSummary
where
    S: TableSink + ?Sized,
{
    let mut summary = session.summary();
    match sink.count_rows(session.table()).await {
        Ok(count) => {
            info!("Table {} holds {count} rows", session.table());
            summary.rows_in_table = Some(count);
        }
        Err(e) => warn!("Could not count rows in {}: {e:#}", session.table()),
    }
    summary
}

async fn stream_rows<S>(
    sink: &S,
    config: &Config,
    source: OpenedSource,
    table: &str,
) -> Result<FileOutcome>
where
    S: TableSink + ?Sized,
{
    let OpenedSource {
        mut reader,
        columns,
        size,
    } = source;
    let width = columns.len();

    let mut session = ImportSession::new(table, config.max_errors);
    let mut writer = BatchWriter::new(
        sink,
        InsertStatement::new(table, columns),
        config.batch_size,
    );
    let mut progress = ByteProgress::new(size, table, config.show_progress);
    progress.set_position(reader.position().byte());

    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                session.rows_read += 1;
                let row = fit_record(&record, width);

                if let Some(outcome) = writer.push(row, &mut session).await {
                    debug!("Batch written to {table}: {outcome:?}");
                    if outcome.is_aborted() {
                        progress.abandon();
                        return Ok(FileOutcome::Aborted(finish_session(sink, &session).await));
                    }
                }

                if session.rows_read % config.sync_interval == 0 {
                    info!("Processed {} rows", session.rows_read);
                    sync_remote(sink).await;
                }
            }
            Err(e) => {
                warn!("Failed to read row after {} rows: {e}", session.rows_read);
                if session.record_error() {
                    error!(
                        "Too many errors ({}), aborting import of {table}",
                        session.errors
                    );
                    progress.abandon();
                    return Ok(FileOutcome::Aborted(finish_session(sink, &session).await));
                }
            }
        }
        progress.set_position(reader.position().byte());
    }

    if let Some(outcome) = writer.flush(&mut session).await {
        debug!("Final batch written to {table}: {outcome:?}");
        if outcome.is_aborted() {
            progress.abandon();
            return Ok(FileOutcome::Aborted(finish_session(sink, &session).await));
        }
    }

    sync_remote(sink).await;
    progress.finish();

    let summary = finish_session(sink, &session).await;
    info!("Import completed: {summary}");
    Ok(FileOutcome::Completed(summary))
}

/// Import one CSV file into `table`.
///
/// Problems confined to this file (unreadable file, bad header, too many row
/// errors) are reported in the returned [`FileOutcome`]. An `Err` means the
/// run cannot continue, e.g. [`ImportError::CreateTable`].
pub async fn process_file<S>(
    sink: &S,
    config: &Config,
    path: &Path,
    table: &str,
) -> Result<FileOutcome>
where
    S: TableSink + ?Sized,
{
    info!("Processing file: {} -> table: {table}", path.display());

    let source = match open_source(path, config).await {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to process file {}: {e:#}", path.display());
            return Ok(FileOutcome::Failed {
                table: table.to_string(),
                reason: format!("{e:#}"),
            });
        }
    };
    info!("Detected {} columns", source.columns.len());

    match establish_schema(sink, config, table, &source.columns).await? {
        SchemaAction::Skipped => {
            return Ok(FileOutcome::Skipped {
                table: table.to_string(),
                reason: SkipReason::TableExists,
            })
        }
        SchemaAction::Created => {}
    }

    if config.create_tables_only {
        info!("Table {table} created, skipping data import");
        return Ok(FileOutcome::SchemaOnly {
            table: table.to_string(),
            columns: source.columns.len(),
        });
    }

    stream_rows(sink, config, source, table).await
}

/// Import every file in `plan`, one after another.
///
/// A file that fails on its own never stops the run; only fatal errors are
/// returned as `Err`.
pub async fn sync<S>(sink: &S, config: &Config, plan: &ImportPlan) -> Result<RunReport>
where
    S: TableSink + ?Sized,
{
    info!("Starting CSV import");
    info!("Files to process: {}", plan.len());
    info!("Batch size: {}", config.batch_size);
    if config.create_tables_only {
        info!("Creating tables only, no rows will be imported");
    }

    let mut report = RunReport::default();

    for planned in plan.files() {
        let outcome = match &planned.collides_with {
            Some(previous) => {
                warn!(
                    "Skipping {}: table {} is already loaded from {}",
                    planned.path.display(),
                    planned.table,
                    previous.display()
                );
                FileOutcome::Skipped {
                    table: planned.table.clone(),
                    reason: SkipReason::NameCollision {
                        previous: previous.clone(),
                    },
                }
            }
            None => process_file(sink, config, &planned.path, &planned.table).await?,
        };
        report.push(planned.path.clone(), outcome);
    }

    report.log_summary();
    Ok(report)
}
