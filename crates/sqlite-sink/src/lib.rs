//! SQLite implementation of `TableSink`.
//!
//! The connection lives behind a `std::sync::Mutex`; calls run inline on the
//! caller's task, which is fine for a sequential importer. File databases are
//! switched to WAL mode so that `sync` has something to flush: it checkpoints
//! the write-ahead log back into the main database file.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use table_sink::sql::{generate_create_table, generate_drop_table, quote_ident};
use table_sink::{InsertStatement, TableSink};
use tracing::{debug, info};

const ID_DEFINITION: &str = "INTEGER PRIMARY KEY AUTOINCREMENT";

/// Where a SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteLocation {
    File(PathBuf),
    Memory,
}

pub struct SqliteSink {
    conn: Mutex<Option<Connection>>,
    location: SqliteLocation,
}

impl SqliteSink {
    /// Open (or create) a database file and enable WAL journaling.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database: {}", path.display()))?;

        let mode: String = conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .context("Failed to enable WAL journal mode")?;
        debug!("SQLite journal mode: {mode}");

        info!("Opened SQLite database: {}", path.display());
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            location: SqliteLocation::File(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            location: SqliteLocation::Memory,
        })
    }

    pub fn location(&self) -> &SqliteLocation {
        &self.location
    }

    /// Run a closure against the open connection.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or_else(|| anyhow!("SQLite connection is closed"))?;
        Ok(f(conn)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection mutex poisoned"))
    }
}

#[async_trait::async_trait]
impl TableSink for SqliteSink {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
            })
            .with_context(|| format!("Failed to look up table {table}"))?;
        Ok(count > 0)
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        let sql = generate_drop_table(table);
        self.with_connection(|conn| conn.execute(&sql, []))
            .with_context(|| format!("Failed to drop table {table}"))?;
        Ok(())
    }

    async fn create_table(&self, table: &str, columns: &[String]) -> Result<()> {
        let sql = generate_create_table(table, columns, ID_DEFINITION);
        debug!("DDL: {sql}");
        self.with_connection(|conn| conn.execute(&sql, []))
            .with_context(|| format!("Failed to create table {table}"))?;
        Ok(())
    }

    async fn insert_batch(&self, statement: &InsertStatement, rows: &[Vec<String>]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let sql = statement.to_sql(|_| "?".to_string());
        self.with_connection(|conn| {
            // Dropping an uncommitted transaction rolls it back.
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(&sql)?;
                for row in rows {
                    stmt.execute(params_from_iter(row.iter()))?;
                }
            }
            tx.commit()
        })
        .with_context(|| {
            format!(
                "Failed to insert batch of {} rows into {}",
                rows.len(),
                statement.table()
            )
        })
    }

    async fn insert_row(&self, statement: &InsertStatement, row: &[String]) -> Result<()> {
        let sql = statement.to_sql(|_| "?".to_string());
        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let inserted = stmt.execute(params_from_iter(row.iter()))?;
            Ok(inserted)
        })
        .with_context(|| format!("Failed to insert row into {}", statement.table()))?;
        Ok(())
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: i64 = self
            .with_connection(|conn| conn.query_row(&sql, [], |row| row.get(0)))
            .with_context(|| format!("Failed to count rows in {table}"))?;
        Ok(count as u64)
    }

    async fn sync(&self) -> Result<()> {
        let busy: i64 = self
            .with_connection(|conn| {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| row.get(0))
            })
            .context("Failed to checkpoint SQLite write-ahead log")?;
        if busy != 0 {
            debug!("WAL checkpoint could not complete, database busy");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let conn = self.lock()?.take();
        match conn {
            Some(conn) => {
                conn.close()
                    .map_err(|(_, e)| e)
                    .context("Failed to close SQLite connection")?;
                info!("SQLite connection closed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
