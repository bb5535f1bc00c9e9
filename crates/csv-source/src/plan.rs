//! Resolving the configured source into the list of files to import.
//!
//! The plan is built before any database connection is opened, so a missing
//! directory or a missing table name fails the run without side effects.

use crate::config::{Config, ImportMode};
use crate::error::ImportError;
use crate::naming::table_name_for_path;
use anyhow::Result;
use censo_sync_file::{is_directory, list_directory};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Extension of the files picked up in directory mode.
pub const CSV_EXTENSION: &str = "csv";

/// One file and the table it loads into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub table: String,
    /// Set when an earlier file in the plan already maps to `table`.
    pub collides_with: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
    files: Vec<PlannedFile>,
}

impl ImportPlan {
    /// Validate `config` and resolve its source.
    pub async fn build(config: &Config) -> Result<Self> {
        config.validate()?;

        match &config.mode {
            ImportMode::File { path, table } => {
                let table = table.clone().ok_or(ImportError::MissingTable)?;
                Ok(Self {
                    files: vec![PlannedFile {
                        path: path.clone(),
                        table,
                        collides_with: None,
                    }],
                })
            }
            ImportMode::Directory(dir) => Self::scan_directory(dir, &config.table_prefix).await,
        }
    }

    async fn scan_directory(dir: &Path, table_prefix: &str) -> Result<Self> {
        info!("Scanning directory: {}", dir.display());

        if !is_directory(dir).await {
            return Err(ImportError::DirectoryNotFound(dir.to_path_buf()).into());
        }

        let csv_files: Vec<_> = list_directory(dir)
            .await?
            .into_iter()
            .filter(|f| f.has_extension(CSV_EXTENSION))
            .collect();

        if csv_files.is_empty() {
            warn!("No CSV files found in directory: {}", dir.display());
            return Ok(Self::default());
        }

        info!("Found {} CSV files to process", csv_files.len());

        let mut claimed: HashMap<String, PathBuf> = HashMap::new();
        let mut files = Vec::with_capacity(csv_files.len());
        for file in csv_files {
            let Some(table) = table_name_for_path(file.path(), table_prefix) else {
                warn!("Skipping file with a non UTF-8 name: {}", file.display_name());
                continue;
            };

            let collides_with = claimed.get(&table).cloned();
            if collides_with.is_none() {
                claimed.insert(table.clone(), file.path().to_path_buf());
            }

            files.push(PlannedFile {
                path: file.path().to_path_buf(),
                table,
                collides_with,
            });
        }

        Ok(Self { files })
    }

    pub fn files(&self) -> &[PlannedFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn directory_config(dir: &Path) -> Config {
        Config {
            mode: ImportMode::Directory(dir.to_path_buf()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_directory_is_fatal() {
        let config = directory_config(Path::new("/nonexistent/censo"));
        let err = ImportPlan::build(&config).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::DirectoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_directory_gives_empty_plan() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let plan = ImportPlan::build(&directory_config(dir.path())).await.unwrap();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn test_directory_plan_derives_tables() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Base de Datos de Poblacion - Resumen.csv"), "a\n").unwrap();
        std::fs::write(dir.path().join("Viviendas.CSV"), "a\n").unwrap();
        std::fs::write(dir.path().join("readme.md"), "a\n").unwrap();

        let plan = ImportPlan::build(&directory_config(dir.path())).await.unwrap();
        let tables: Vec<_> = plan.files().iter().map(|f| f.table.as_str()).collect();
        assert_eq!(tables, vec!["censo_poblacion", "censo_viviendas"]);
        assert!(plan.files().iter().all(|f| f.collides_with.is_none()));
    }

    #[tokio::test]
    async fn test_collisions_are_flagged() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("Base de Datos de Hogar - Parte 1.csv");
        let second = dir.path().join("Base de Datos de Hogar - Parte 2.csv");
        std::fs::write(&first, "a\n").unwrap();
        std::fs::write(&second, "a\n").unwrap();

        let plan = ImportPlan::build(&directory_config(dir.path())).await.unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.files()[0].table, "censo_hogar");
        assert_eq!(plan.files()[0].collides_with, None);
        assert_eq!(plan.files()[1].table, "censo_hogar");
        assert_eq!(plan.files()[1].collides_with, Some(first));
    }

    #[tokio::test]
    async fn test_single_file_plan() {
        let config = Config {
            mode: ImportMode::File {
                path: PathBuf::from("/data/x.csv"),
                table: Some("mi_tabla".to_string()),
            },
            ..Default::default()
        };
        let plan = ImportPlan::build(&config).await.unwrap();
        assert_eq!(plan.files()[0].table, "mi_tabla");
    }

    #[tokio::test]
    async fn test_single_file_without_table_is_fatal() {
        let config = Config {
            mode: ImportMode::File {
                path: PathBuf::from("/data/x.csv"),
                table: None,
            },
            ..Default::default()
        };
        let err = ImportPlan::build(&config).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::MissingTable)
        ));
    }
}
