//! Local source file discovery for census imports
//!
//! This crate finds the delimited text files an import run should load and
//! opens them for streaming.
//!
//! # Directory Listing
//!
//! Only the immediate children of a directory are considered. Subdirectories
//! are skipped, and callers filter by extension with
//! [`SourceFile::has_extension`], which ignores case:
//!
//! ```ignore
//! use censo_sync_file::{list_directory, DEFAULT_BUFFER_SIZE};
//!
//! let files = list_directory(Path::new("/data/censo/")).await?;
//! for file in files.iter().filter(|f| f.has_extension("csv")) {
//!     let reader = file.open(DEFAULT_BUFFER_SIZE).await?;
//!     // Process reader...
//! }
//! ```

mod local;

use std::path::{Path, PathBuf};

pub use local::{is_directory, list_directory, LocalFileReader};

/// Default buffer size for reading operations (1MB)
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// A regular file on the local filesystem, with its size at discovery time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    size: u64,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    /// Stat a single file path
    pub async fn from_path(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.into();
        let metadata = tokio::fs::metadata(&path)
            .await
            .with_context(|| format!("Failed to get metadata for: {}", path.display()))?;
        if !metadata.is_file() {
            anyhow::bail!("Not a regular file: {}", path.display());
        }
        Ok(Self::new(path, metadata.len()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Open this file and return a buffered reader
    pub async fn open(&self, buffer_size: usize) -> anyhow::Result<Box<dyn std::io::Read + Send>> {
        LocalFileReader::open(self.path.clone(), buffer_size).await
    }

    /// Get a display name for logging
    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    /// File name without its extension
    pub fn file_stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }

    /// Get the file extension (without the dot)
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    /// Case-insensitive extension check
    pub fn has_extension(&self, extension: &str) -> bool {
        self.extension()
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_and_stem() {
        let file = SourceFile::new("/data/Base de Datos de Hogar - Parte 1.csv", 10);
        assert_eq!(file.extension(), Some("csv"));
        assert_eq!(file.file_stem(), Some("Base de Datos de Hogar - Parte 1"));
        assert_eq!(file.size(), 10);
    }

    #[test]
    fn test_has_extension_ignores_case() {
        assert!(SourceFile::new("/data/POBLACION.CSV", 0).has_extension("csv"));
        assert!(SourceFile::new("/data/vivienda.Csv", 0).has_extension("csv"));
        assert!(!SourceFile::new("/data/notes.txt", 0).has_extension("csv"));
        assert!(!SourceFile::new("/data/README", 0).has_extension("csv"));
    }

    #[tokio::test]
    async fn test_from_path_rejects_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(SourceFile::from_path(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_from_path_records_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "x,y\n1,2\n").unwrap();

        let file = SourceFile::from_path(&path).await.unwrap();
        assert_eq!(file.size(), 8);
        assert_eq!(file.path(), path.as_path());
    }
}
