//! Shared helpers for importer integration tests.

#![allow(dead_code)]

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use table_sink::{InsertStatement, TableSink};

/// Marker value that makes the scripted sink reject a row.
pub const POISON: &str = "FAIL";

#[derive(Debug, Default, Clone)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    batch_calls: usize,
    row_calls: usize,
    sync_calls: usize,
    closed: bool,
}

/// In-memory sink whose failures are scripted.
///
/// Any row containing [`POISON`] fails, both inside a batch (failing the
/// whole batch) and on its own.
#[derive(Debug, Default)]
pub struct ScriptedSink {
    state: Mutex<State>,
    pub fail_exists: bool,
    pub fail_drop: bool,
    pub fail_create: bool,
    pub fail_sync: bool,
}

impl ScriptedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<Table> {
        self.state.lock().unwrap().tables.get(name).cloned()
    }

    pub fn table_count(&self) -> usize {
        self.state.lock().unwrap().tables.len()
    }

    pub fn batch_calls(&self) -> usize {
        self.state.lock().unwrap().batch_calls
    }

    pub fn row_calls(&self) -> usize {
        self.state.lock().unwrap().row_calls
    }

    pub fn sync_calls(&self) -> usize {
        self.state.lock().unwrap().sync_calls
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

fn poisoned(row: &[String]) -> bool {
    row.iter().any(|v| v == POISON)
}

#[async_trait::async_trait]
impl TableSink for ScriptedSink {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        if self.fail_exists {
            bail!("catalog unavailable");
        }
        Ok(self.state.lock().unwrap().tables.contains_key(table))
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        if self.fail_drop {
            bail!("drop refused");
        }
        self.state.lock().unwrap().tables.remove(table);
        Ok(())
    }

    async fn create_table(&self, table: &str, columns: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if self.fail_create || state.tables.contains_key(table) {
            bail!("table {table} cannot be created");
        }
        state.tables.insert(
            table.to_string(),
            Table {
                columns: columns.to_vec(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn insert_batch(&self, statement: &InsertStatement, rows: &[Vec<String>]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.batch_calls += 1;
        if rows.iter().any(|r| poisoned(r)) {
            bail!("batch rejected");
        }
        let Some(table) = state.tables.get_mut(statement.table()) else {
            bail!("no such table: {}", statement.table());
        };
        table.rows.extend(rows.iter().cloned());
        Ok(())
    }

    async fn insert_row(&self, statement: &InsertStatement, row: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.row_calls += 1;
        if poisoned(row) {
            bail!("row rejected");
        }
        let Some(table) = state.tables.get_mut(statement.table()) else {
            bail!("no such table: {}", statement.table());
        };
        table.rows.push(row.to_vec());
        Ok(())
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        match self.state.lock().unwrap().tables.get(table) {
            Some(t) => Ok(t.rows.len() as u64),
            None => bail!("no such table: {table}"),
        }
    }

    async fn sync(&self) -> Result<()> {
        self.state.lock().unwrap().sync_calls += 1;
        if self.fail_sync {
            bail!("remote unreachable");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Write a CSV file made of a header line and `rows`.
pub fn write_csv(dir: &Path, name: &str, header: &str, rows: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut contents = String::from(header);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    std::fs::write(&path, contents).unwrap();
    path
}

/// `count` rows of `<n>,value<n>`, with the listed 1-based rows poisoned.
pub fn numbered_rows(count: usize, poisoned: impl Fn(usize) -> bool) -> Vec<String> {
    (1..=count)
        .map(|n| {
            if poisoned(n) {
                format!("{n},{POISON}")
            } else {
                format!("{n},value{n}")
            }
        })
        .collect()
}
