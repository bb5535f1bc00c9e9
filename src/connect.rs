use crate::DestinationOpts;
use anyhow::{bail, Result};
use libsql_sink::LibsqlSink;
use postgresql_sink::PostgreSqlSink;
use sqlite_sink::{SqliteLocation, SqliteSink};
use std::path::{Path, PathBuf};
use table_sink::TableSink;

const SQLITE_EXTENSIONS: [&str; 3] = ["db", "sqlite", "sqlite3"];

/// A destination database resolved from its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Sqlite(SqliteLocation),
    PostgreSql { url: String },
    Libsql { url: String },
}

impl Destination {
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();

        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(Destination::PostgreSql {
                url: url.to_string(),
            });
        }

        if url.starts_with("libsql://") {
            return Ok(Destination::Libsql {
                url: url.to_string(),
            });
        }

        if let Some(rest) = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
        {
            return match rest {
                "" => bail!("SQLite URL has no database path: {url}"),
                ":memory:" => Ok(Destination::Sqlite(SqliteLocation::Memory)),
                path => Ok(Destination::Sqlite(SqliteLocation::File(PathBuf::from(
                    path,
                )))),
            };
        }

        let has_sqlite_extension = Path::new(url)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                SQLITE_EXTENSIONS
                    .iter()
                    .any(|known| e.eq_ignore_ascii_case(known))
            });
        if has_sqlite_extension {
            return Ok(Destination::Sqlite(SqliteLocation::File(PathBuf::from(url))));
        }

        bail!(
            "Unsupported database URL '{url}': expected sqlite:PATH, a .db/.sqlite file, postgresql://... or libsql://..."
        )
    }
}

/// Open the configured destination.
pub async fn connect_destination(opts: &DestinationOpts) -> Result<Box<dyn TableSink>> {
    match Destination::parse(&opts.database_url)? {
        Destination::Sqlite(SqliteLocation::File(path)) => Ok(Box::new(SqliteSink::open(path)?)),
        Destination::Sqlite(SqliteLocation::Memory) => {
            Ok(Box::new(SqliteSink::open_in_memory()?))
        }
        Destination::PostgreSql { url } => Ok(Box::new(
            PostgreSqlSink::connect(&url, opts.auth_token.as_deref()).await?,
        )),
        Destination::Libsql { url } => {
            let token = opts.auth_token.as_deref();
            let sink = match &opts.replica_path {
                Some(path) => LibsqlSink::connect_replica(path, &url, token).await?,
                None => LibsqlSink::connect_remote(&url, token).await?,
            };
            Ok(Box::new(sink))
        }
    }
}
