//! Batched inserts with per-row fallback.
//!
//! A batch is written in one transaction. If that fails, each row is retried
//! on its own and committed independently; every row that still fails counts
//! against the session's error ceiling. Once the ceiling is hit the batch
//! stops where it is. Rows committed before that point stay in the table.

use crate::outcome::ImportSession;
use table_sink::{InsertStatement, TableSink};
use tracing::{debug, error, warn};

/// What happened to one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The whole batch went in as one transaction.
    Committed { rows: usize },
    /// The batch failed and was retried row by row.
    Recovered { inserted: usize, failed: usize },
    /// Row retries hit the error ceiling; the file must stop.
    CeilingReached { inserted: usize, failed: usize },
}

impl BatchOutcome {
    pub fn inserted(&self) -> usize {
        match *self {
            BatchOutcome::Committed { rows } => rows,
            BatchOutcome::Recovered { inserted, .. }
            | BatchOutcome::CeilingReached { inserted, .. } => inserted,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, BatchOutcome::CeilingReached { .. })
    }
}

/// Insert `rows` as one unit, falling back to single-row inserts.
pub async fn write_batch<S>(
    sink: &S,
    statement: &InsertStatement,
    rows: &[Vec<String>],
    session: &mut ImportSession,
) -> BatchOutcome
where
    S: TableSink + ?Sized,
{
    let batch_error = match sink.insert_batch(statement, rows).await {
        Ok(()) => {
            session.rows_inserted += rows.len() as u64;
            return BatchOutcome::Committed { rows: rows.len() };
        }
        Err(e) => e,
    };

    session.failed_batches += 1;
    warn!(
        "Batch insert into {} failed, retrying {} rows one by one: {batch_error:#}",
        statement.table(),
        rows.len()
    );

    let mut inserted = 0;
    let mut failed = 0;
    for row in rows {
        match sink.insert_row(statement, row).await {
            Ok(()) => {
                inserted += 1;
                session.rows_inserted += 1;
            }
            Err(e) => {
                failed += 1;
                debug!("Row insert into {} failed: {e:#}", statement.table());
                if session.record_error() {
                    error!(
                        "Too many errors ({}), aborting import of {}",
                        session.errors,
                        statement.table()
                    );
                    return BatchOutcome::CeilingReached { inserted, failed };
                }
            }
        }
    }

    BatchOutcome::Recovered { inserted, failed }
}

/// Buffers shaped rows and writes them out in fixed-size batches.
pub struct BatchWriter<'a, S: ?Sized> {
    sink: &'a S,
    statement: InsertStatement,
    batch: Vec<Vec<String>>,
    batch_size: usize,
}

impl<'a, S> BatchWriter<'a, S>
where
    S: TableSink + ?Sized,
{
    pub fn new(sink: &'a S, statement: InsertStatement, batch_size: usize) -> Self {
        Self {
            sink,
            statement,
            batch: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    pub fn statement(&self) -> &InsertStatement {
        &self.statement
    }

    /// Rows buffered but not yet written.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Buffer a row that already has the statement's column count. Writes
    /// the batch when it is full and returns what happened to it.
    pub async fn push(
        &mut self,
        row: Vec<String>,
        session: &mut ImportSession,
    ) -> Option<BatchOutcome> {
        debug_assert_eq!(row.len(), self.statement.column_count());
        self.batch.push(row);
        if self.batch.len() >= self.batch_size {
            self.flush(session).await
        } else {
            None
        }
    }

    /// Write whatever is buffered. Returns `None` when nothing was.
    pub async fn flush(&mut self, session: &mut ImportSession) -> Option<BatchOutcome> {
        if self.batch.is_empty() {
            return None;
        }
        let outcome = write_batch(self.sink, &self.statement, &self.batch, session).await;
        self.batch.clear();
        Some(outcome)
    }
}
