use censo_sync::connect::{connect_destination, Destination};
use censo_sync::csv::{FileOutcome, ImportError, ImportMode, ImportPlan};
use censo_sync::{import_and_close, Cli, DestinationOpts};
use clap::Parser;
use sqlite_sink::{SqliteLocation, SqliteSink};
use std::path::PathBuf;
use table_sink::TableSink;
use tempfile::TempDir;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    let mut argv = vec!["censo-sync"];
    argv.extend_from_slice(args);
    argv.extend_from_slice(&["--database-url", "sqlite::memory:"]);
    Cli::try_parse_from(argv)
}

#[test]
fn test_defaults() {
    let cli = parse(&[]).unwrap();
    let config = cli.import_config().unwrap();

    assert_eq!(
        config.mode,
        ImportMode::Directory(PathBuf::from("assets/Bases-Finales-CPV2024SV-CSV"))
    );
    assert_eq!(config.batch_size, 200);
    assert_eq!(config.max_errors, 100);
    assert_eq!(config.sync_interval, 1000);
    assert_eq!(config.table_prefix, "censo_");
    assert_eq!(config.delimiter, b',');
    assert!(!config.create_tables_only);
    assert!(!config.skip_existing);
    assert!(config.show_progress);
}

#[test]
fn test_directory_flags() {
    let cli = parse(&[
        "--directory",
        "/data/censo",
        "--create-tables-only",
        "--skip-existing",
        "--batch-size",
        "50",
        "--max-errors",
        "10",
        "--sync-interval",
        "500",
        "--table-prefix",
        "cpv_",
        "--delimiter",
        ";",
        "--no-progress",
    ])
    .unwrap();
    let config = cli.import_config().unwrap();

    assert_eq!(config.mode, ImportMode::Directory(PathBuf::from("/data/censo")));
    assert!(config.create_tables_only);
    assert!(config.skip_existing);
    assert_eq!(config.batch_size, 50);
    assert_eq!(config.max_errors, 10);
    assert_eq!(config.sync_interval, 500);
    assert_eq!(config.table_prefix, "cpv_");
    assert_eq!(config.delimiter, b';');
    assert!(!config.show_progress);
}

#[test]
fn test_single_file_mode() {
    let cli = parse(&["--file", "hogar.csv", "--table", "hogar"]).unwrap();
    let config = cli.import_config().unwrap();

    assert_eq!(
        config.mode,
        ImportMode::File {
            path: PathBuf::from("hogar.csv"),
            table: Some("hogar".to_string()),
        }
    );
}

#[test]
fn test_file_requires_table() {
    assert!(parse(&["--file", "hogar.csv"]).is_err());
    assert!(parse(&["--table", "hogar"]).is_err());
}

#[test]
fn test_file_conflicts_with_directory() {
    assert!(parse(&["--directory", "/data", "--file", "a.csv", "--table", "a"]).is_err());
}

#[test]
fn test_blank_table_rejected_before_connecting() {
    let cli = parse(&["--file", "hogar.csv", "--table", " "]).unwrap();
    let err = cli.import_config().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ImportError>(),
        Some(ImportError::MissingTable)
    ));
}

#[test]
fn test_zero_batch_size_rejected() {
    let cli = parse(&["--batch-size", "0"]).unwrap();
    assert!(cli.import_config().is_err());
}

#[test]
fn test_non_ascii_delimiter_rejected() {
    let cli = parse(&["--delimiter", "¦"]).unwrap();
    assert!(cli.import_config().is_err());
}

#[test]
fn test_destination_sqlite_forms() {
    assert_eq!(
        Destination::parse("sqlite:censo.db").unwrap(),
        Destination::Sqlite(SqliteLocation::File(PathBuf::from("censo.db")))
    );
    assert_eq!(
        Destination::parse("sqlite:///var/lib/censo.sqlite").unwrap(),
        Destination::Sqlite(SqliteLocation::File(PathBuf::from("/var/lib/censo.sqlite")))
    );
    assert_eq!(
        Destination::parse("sqlite::memory:").unwrap(),
        Destination::Sqlite(SqliteLocation::Memory)
    );
    assert_eq!(
        Destination::parse("./out/CENSO.SQLITE3").unwrap(),
        Destination::Sqlite(SqliteLocation::File(PathBuf::from("./out/CENSO.SQLITE3")))
    );
}

#[test]
fn test_destination_postgresql_forms() {
    for url in [
        "postgres://censo@localhost/censo",
        "postgresql://censo@db.example.com:5432/censo",
    ] {
        assert_eq!(
            Destination::parse(url).unwrap(),
            Destination::PostgreSql {
                url: url.to_string()
            }
        );
    }
}

#[test]
fn test_destination_libsql_form() {
    assert_eq!(
        Destination::parse(" libsql://censo-org.turso.io ").unwrap(),
        Destination::Libsql {
            url: "libsql://censo-org.turso.io".to_string()
        }
    );
}

#[test]
fn test_replica_path_flag() {
    let cli = parse(&["--replica-path", "replica.db"]).unwrap();
    assert_eq!(cli.destination.replica_path, Some(PathBuf::from("replica.db")));
}

#[tokio::test]
async fn test_libsql_requires_auth_token() {
    let dir = TempDir::new().unwrap();
    for replica_path in [None, Some(dir.path().join("replica.db"))] {
        let opts = DestinationOpts {
            database_url: "libsql://censo-org.turso.io".to_string(),
            auth_token: None,
            replica_path,
        };
        let err = connect_destination(&opts).await.err().unwrap();
        assert!(format!("{err:#}").contains("auth token"));
    }
}

#[test]
fn test_destination_rejects_unknown() {
    assert!(Destination::parse("mysql://root@localhost/censo").is_err());
    assert!(Destination::parse("censo.csv").is_err());
    assert!(Destination::parse("sqlite:").is_err());
}

#[tokio::test]
async fn test_import_closes_sink() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Base de Datos de Poblacion - Resumen.csv");
    std::fs::write(&path, "Nombre,Edad\nAna,34\nLuis,50\n").unwrap();

    let cli = parse(&["--directory", dir.path().to_str().unwrap(), "--no-progress"]).unwrap();
    let config = cli.import_config().unwrap();
    let plan = ImportPlan::build(&config).await.unwrap();

    let sink = SqliteSink::open_in_memory().unwrap();
    let report = import_and_close(&sink, &config, &plan).await.unwrap();

    let outcome = report.outcome_for(&path).unwrap();
    assert!(matches!(outcome, FileOutcome::Completed(s) if s.rows_inserted == 2));
    // The connection is gone once the import returns
    assert!(sink.count_rows("censo_poblacion").await.is_err());
}

#[test]
fn test_missing_directory_fails_before_connecting() {
    let cli = parse(&["--directory", "/nonexistent/censo"]).unwrap();
    let config = cli.import_config().unwrap();

    let err = tokio_test::block_on(ImportPlan::build(&config)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ImportError>(),
        Some(ImportError::DirectoryNotFound(_))
    ));
}
