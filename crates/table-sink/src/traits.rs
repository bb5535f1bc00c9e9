//! TableSink trait definition.
//!
//! This trait abstracts over the destination database, allowing the
//! importer to be compiled against a single interface that works with
//! SQLite files and PostgreSQL servers alike.

use crate::InsertStatement;
use anyhow::Result;

/// Trait for writing imported rows into destination tables.
///
/// # Usage Pattern
///
/// The importer uses generics for zero-cost dispatch:
///
/// ```ignore
/// pub async fn sync<S: TableSink>(sink: &S, config: &Config, plan: &ImportPlan) -> Result<RunReport> {
///     // All calls here are statically dispatched after monomorphization
///     sink.insert_batch(&statement, &batch).await?;
/// }
/// ```
///
/// The CLI entry point branches once on the destination URL, and after
/// that all code is monomorphized for the specific implementation.
///
/// Every mutating method commits its own work; there is no transaction
/// spanning two calls.
#[async_trait::async_trait]
pub trait TableSink: Send + Sync {
    /// Check the catalog for a table with this exact name.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Drop the table if it exists.
    async fn drop_table(&self, table: &str) -> Result<()>;

    /// Create a table with an auto-incrementing `id` primary key followed by
    /// one TEXT column per entry in `columns`, in order.
    async fn create_table(&self, table: &str, columns: &[String]) -> Result<()>;

    /// Insert every row in a single transaction.
    ///
    /// Either all rows are committed or none are; on error the transaction
    /// has been rolled back. Each row must have exactly
    /// `statement.column_count()` values.
    async fn insert_batch(&self, statement: &InsertStatement, rows: &[Vec<String>]) -> Result<()>;

    /// Insert and commit a single row.
    async fn insert_row(&self, statement: &InsertStatement, row: &[String]) -> Result<()>;

    /// Number of rows currently stored in the table.
    async fn count_rows(&self, table: &str) -> Result<u64>;

    /// Push committed writes to the durable remote copy.
    ///
    /// Distinct from commit: a sink whose commits are already remote may
    /// treat this as a no-op.
    async fn sync(&self) -> Result<()>;

    /// Release the connection. Later calls on this sink fail.
    async fn close(&self) -> Result<()>;
}
