//! PostgreSQL implementation of `TableSink`.
//!
//! The credential is never part of the compiled configuration: it arrives at
//! runtime as an auth token and is applied as the connection password.

use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use table_sink::sql::{generate_create_table, generate_drop_table, quote_ident};
use table_sink::{InsertStatement, TableSink};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Statement};
use tracing::{debug, info};

const ID_DEFINITION: &str = "BIGSERIAL PRIMARY KEY";

struct Inner {
    client: Client,
    /// Prepared INSERTs keyed by SQL text. Cleared whenever DDL runs,
    /// since a recreated table invalidates them.
    statements: HashMap<String, Statement>,
    connection: JoinHandle<()>,
}

pub struct PostgreSqlSink {
    inner: Mutex<Option<Inner>>,
}

/// Build a connection config from a URL and an optional auth token.
///
/// The token, when given, replaces any password in the URL. A connection
/// without any password is rejected.
pub fn connection_config(url: &str, auth_token: Option<&str>) -> Result<tokio_postgres::Config> {
    let mut config: tokio_postgres::Config = url
        .parse()
        .context("Invalid PostgreSQL connection string")?;

    if let Some(token) = auth_token {
        config.password(token);
    }

    if config.get_password().is_none() {
        bail!("PostgreSQL destination requires an auth token (CENSO_AUTH_TOKEN)");
    }

    Ok(config)
}

impl PostgreSqlSink {
    /// Connect and verify the connection with a trivial query.
    pub async fn connect(url: &str, auth_token: Option<&str>) -> Result<Self> {
        let config = connection_config(url, auth_token)?;
        let (client, connection) = config
            .connect(NoTls)
            .await
            .context("Failed to connect to PostgreSQL")?;

        // Spawn the connection task
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        // Test connection
        client.simple_query("SELECT 1").await?;
        info!("Connected to PostgreSQL");

        Ok(Self {
            inner: Mutex::new(Some(Inner {
                client,
                statements: HashMap::new(),
                connection,
            })),
        })
    }
}

impl Inner {
    async fn prepared(&mut self, sql: &str) -> Result<Statement> {
        if let Some(stmt) = self.statements.get(sql) {
            return Ok(stmt.clone());
        }
        let stmt = self.client.prepare(sql).await?;
        self.statements.insert(sql.to_string(), stmt.clone());
        Ok(stmt)
    }
}

fn params(row: &[String]) -> Vec<&(dyn ToSql + Sync)> {
    row.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn closed() -> anyhow::Error {
    anyhow!("PostgreSQL connection is closed")
}

#[async_trait::async_trait]
impl TableSink for PostgreSqlSink {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let guard = self.inner.lock().await;
        let inner = guard.as_ref().ok_or_else(closed)?;
        let row = inner
            .client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1)",
                &[&table],
            )
            .await
            .with_context(|| format!("Failed to look up table {table}"))?;
        Ok(row.get(0))
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = guard.as_mut().ok_or_else(closed)?;
        inner.statements.clear();
        inner
            .client
            .execute(&generate_drop_table(table), &[])
            .await
            .with_context(|| format!("Failed to drop table {table}"))?;
        Ok(())
    }

    async fn create_table(&self, table: &str, columns: &[String]) -> Result<()> {
        let sql = generate_create_table(table, columns, ID_DEFINITION);
        debug!("DDL: {sql}");

        let mut guard = self.inner.lock().await;
        let inner = guard.as_mut().ok_or_else(closed)?;
        inner.statements.clear();
        inner
            .client
            .execute(&sql, &[])
            .await
            .with_context(|| format!("Failed to create table {table}"))?;
        Ok(())
    }

    async fn insert_batch(&self, statement: &InsertStatement, rows: &[Vec<String>]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let sql = statement.to_sql(|i| format!("${i}"));
        let mut guard = self.inner.lock().await;
        let inner = guard.as_mut().ok_or_else(closed)?;
        let stmt = inner.prepared(&sql).await?;

        // An uncommitted transaction is rolled back when dropped.
        let tx = inner.client.transaction().await?;
        for row in rows {
            tx.execute(&stmt, &params(row)).await.with_context(|| {
                format!(
                    "Failed to insert batch of {} rows into {}",
                    rows.len(),
                    statement.table()
                )
            })?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_row(&self, statement: &InsertStatement, row: &[String]) -> Result<()> {
        let sql = statement.to_sql(|i| format!("${i}"));
        let mut guard = self.inner.lock().await;
        let inner = guard.as_mut().ok_or_else(closed)?;
        let stmt = inner.prepared(&sql).await?;
        inner
            .client
            .execute(&stmt, &params(row))
            .await
            .with_context(|| format!("Failed to insert row into {}", statement.table()))?;
        Ok(())
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        let guard = self.inner.lock().await;
        let inner = guard.as_ref().ok_or_else(closed)?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let row = inner.client.query_one(&sql, &[]).await?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }

    async fn sync(&self) -> Result<()> {
        let guard = self.inner.lock().await;
        if guard.is_none() {
            return Err(closed());
        }
        debug!("PostgreSQL commits are durable on the server, nothing to sync");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let inner = self.inner.lock().await.take();
        if let Some(Inner {
            client, connection, ..
        }) = inner
        {
            drop(client);
            if let Err(e) = connection.await {
                debug!("PostgreSQL connection task ended abnormally: {e}");
            }
            info!("PostgreSQL connection closed");
        }
        Ok(())
    }
}
