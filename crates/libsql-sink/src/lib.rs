//! libSQL implementation of `TableSink`, for Turso-hosted databases.
//!
//! Three ways to reach a database:
//!
//! - **Embedded replica**: writes go to the remote primary and are read back
//!   through a local replica file. `sync` pulls the primary's frames into the
//!   replica.
//! - **Remote**: every statement goes over HTTP; there is nothing to sync.
//! - **Local**: a plain libSQL file or `:memory:` database.
//!
//! Replica and local databases run libSQL's own SQLite engine and are only
//! compiled with the `replica` feature. The remote client is always available.
//!
//! The auth token is supplied at runtime and never stored in configuration.

use anyhow::{anyhow, bail, Context, Result};
use libsql::{Builder, Connection, Database, Value};
use std::path::Path;
#[cfg(feature = "replica")]
use std::path::PathBuf;
use table_sink::sql::{generate_create_table, generate_drop_table, quote_ident};
use table_sink::{InsertStatement, TableSink};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const ID_DEFINITION: &str = "INTEGER PRIMARY KEY AUTOINCREMENT";

/// How the sink reaches its database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibsqlMode {
    #[cfg(feature = "replica")]
    Replica { path: PathBuf, url: String },
    Remote { url: String },
    #[cfg(feature = "replica")]
    Local { path: PathBuf },
}

struct Inner {
    #[cfg_attr(not(feature = "replica"), allow(dead_code))]
    db: Database,
    conn: Connection,
}

pub struct LibsqlSink {
    inner: Mutex<Option<Inner>>,
    mode: LibsqlMode,
}

fn require_token(auth_token: Option<&str>) -> Result<String> {
    match auth_token.map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => bail!("libSQL destination requires an auth token (CENSO_AUTH_TOKEN)"),
    }
}

fn text_params(row: &[String]) -> Vec<Value> {
    row.iter().map(|v| Value::Text(v.clone())).collect()
}

fn closed() -> anyhow::Error {
    anyhow!("libSQL connection is closed")
}

impl LibsqlSink {
    /// Connect through an embedded replica stored at `replica_path`, then
    /// pull the current state of the primary.
    #[cfg(feature = "replica")]
    pub async fn connect_replica(
        replica_path: impl AsRef<Path>,
        url: &str,
        auth_token: Option<&str>,
    ) -> Result<Self> {
        let token = require_token(auth_token)?;
        let path = replica_path.as_ref().to_path_buf();
        let db = Builder::new_remote_replica(&path, url.to_string(), token)
            .build()
            .await
            .with_context(|| format!("Failed to open libSQL replica at {}", path.display()))?;

        let sink = Self::from_database(
            db,
            LibsqlMode::Replica {
                path,
                url: url.to_string(),
            },
        )
        .await?;
        sink.sync().await.context("Initial replica sync failed")?;
        info!("Connected to libSQL primary {url} through an embedded replica");
        Ok(sink)
    }

    #[cfg(not(feature = "replica"))]
    pub async fn connect_replica(
        replica_path: impl AsRef<Path>,
        _url: &str,
        auth_token: Option<&str>,
    ) -> Result<Self> {
        require_token(auth_token)?;
        bail!(
            "Cannot open replica {}: libSQL embedded replicas need the `replica` feature",
            replica_path.as_ref().display()
        )
    }

    /// Connect straight to the remote database.
    pub async fn connect_remote(url: &str, auth_token: Option<&str>) -> Result<Self> {
        let token = require_token(auth_token)?;
        let db = Builder::new_remote(url.to_string(), token)
            .build()
            .await
            .context("Failed to build libSQL remote client")?;

        let sink = Self::from_database(
            db,
            LibsqlMode::Remote {
                url: url.to_string(),
            },
        )
        .await?;
        info!("Connected to libSQL database {url}");
        Ok(sink)
    }

    /// Open a local libSQL database file, or `:memory:`.
    #[cfg(feature = "replica")]
    pub async fn open_local(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Builder::new_local(&path)
            .build()
            .await
            .with_context(|| format!("Failed to open libSQL database: {}", path.display()))?;
        Self::from_database(db, LibsqlMode::Local { path }).await
    }

    async fn from_database(db: Database, mode: LibsqlMode) -> Result<Self> {
        let conn = db.connect().context("Failed to connect to libSQL database")?;

        // Test connection
        conn.query("SELECT 1", ())
            .await
            .context("libSQL connection check failed")?;

        Ok(Self {
            inner: Mutex::new(Some(Inner { db, conn })),
            mode,
        })
    }

    pub fn mode(&self) -> &LibsqlMode {
        &self.mode
    }

    async fn query_count(&self, sql: &str, params: Vec<Value>) -> Result<i64> {
        let guard = self.inner.lock().await;
        let inner = guard.as_ref().ok_or_else(closed)?;
        let mut rows = inner.conn.query(sql, params).await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| anyhow!("query returned no rows: {sql}"))?;
        Ok(row.get::<i64>(0)?)
    }

    async fn execute_ddl(&self, sql: &str) -> Result<()> {
        let guard = self.inner.lock().await;
        let inner = guard.as_ref().ok_or_else(closed)?;
        inner.conn.execute(sql, ()).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TableSink for LibsqlSink {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let count = self
            .query_count(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                vec![Value::Text(table.to_string())],
            )
            .await
            .with_context(|| format!("Failed to look up table {table}"))?;
        Ok(count > 0)
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        self.execute_ddl(&generate_drop_table(table))
            .await
            .with_context(|| format!("Failed to drop table {table}"))
    }

    async fn create_table(&self, table: &str, columns: &[String]) -> Result<()> {
        let sql = generate_create_table(table, columns, ID_DEFINITION);
        debug!("DDL: {sql}");
        self.execute_ddl(&sql)
            .await
            .with_context(|| format!("Failed to create table {table}"))
    }

    async fn insert_batch(&self, statement: &InsertStatement, rows: &[Vec<String>]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let sql = statement.to_sql(|_| "?".to_string());
        let guard = self.inner.lock().await;
        let inner = guard.as_ref().ok_or_else(closed)?;

        let tx = inner.conn.transaction().await?;
        let mut failure = None;
        for row in rows {
            if let Err(e) = tx.execute(&sql, text_params(row)).await {
                failure = Some(e);
                break;
            }
        }

        match failure {
            None => {
                tx.commit().await?;
                Ok(())
            }
            Some(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback of failed batch on {} failed: {rollback}", statement.table());
                }
                Err(anyhow::Error::new(e).context(format!(
                    "Failed to insert batch of {} rows into {}",
                    rows.len(),
                    statement.table()
                )))
            }
        }
    }

    async fn insert_row(&self, statement: &InsertStatement, row: &[String]) -> Result<()> {
        let sql = statement.to_sql(|_| "?".to_string());
        let guard = self.inner.lock().await;
        let inner = guard.as_ref().ok_or_else(closed)?;
        inner
            .conn
            .execute(&sql, text_params(row))
            .await
            .with_context(|| format!("Failed to insert row into {}", statement.table()))?;
        Ok(())
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count = self
            .query_count(&sql, Vec::new())
            .await
            .with_context(|| format!("Failed to count rows in {table}"))?;
        Ok(count as u64)
    }

    async fn sync(&self) -> Result<()> {
        let guard = self.inner.lock().await;
        #[cfg_attr(not(feature = "replica"), allow(unused_variables))]
        let inner = guard.as_ref().ok_or_else(closed)?;
        match &self.mode {
            #[cfg(feature = "replica")]
            LibsqlMode::Replica { .. } => {
                let replicated = inner
                    .db
                    .sync()
                    .await
                    .context("Failed to sync libSQL replica")?;
                debug!("Replica synced to frame {:?}", replicated.frame_no());
            }
            #[cfg(feature = "replica")]
            LibsqlMode::Local { .. } => debug!("No replica to sync"),
            LibsqlMode::Remote { .. } => {
                debug!("Remote libSQL commits are durable, nothing to sync")
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.inner.lock().await.take().is_some() {
            info!("libSQL connection closed");
        }
        Ok(())
    }
}
