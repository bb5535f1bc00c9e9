//! Local filesystem file reader implementation

use crate::SourceFile;
use anyhow::{Context, Result};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Reads a local file with configurable buffering
pub struct LocalFileReader;

impl LocalFileReader {
    /// Open a local file and return a buffered, sync-compatible reader
    ///
    /// The file is streamed rather than loaded, so the reader's byte position
    /// tracks how far through the file a consumer has got.
    pub async fn open(path: PathBuf, buffer_size: usize) -> Result<Box<dyn std::io::Read + Send>> {
        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        let file = file.into_std().await;
        Ok(Box::new(BufReader::with_capacity(buffer_size, file)))
    }
}

/// Whether `path` exists and is a directory
pub async fn is_directory(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// List all files in a directory (non-recursive, immediate children only)
///
/// Returns only files, not subdirectories.
pub async fn list_directory(path: &Path) -> Result<Vec<SourceFile>> {
    let mut results = Vec::new();

    let mut entries = tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("Failed to read directory: {}", path.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let entry_path = entry.path();
        let metadata = entry
            .metadata()
            .await
            .with_context(|| format!("Failed to get metadata for: {}", entry_path.display()))?;

        // Only include files, skip directories
        if metadata.is_file() {
            results.push(SourceFile::new(entry_path, metadata.len()));
        }
    }

    // Sort for consistent ordering
    results.sort_by_key(|a| a.display_name());

    tracing::debug!(
        "Listed {} files in directory: {}",
        results.len(),
        path.display()
    );

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        std::fs::write(&file_path, "hello world").unwrap();

        let mut reader = LocalFileReader::open(file_path, 1024).await.unwrap();
        let mut contents = String::new();
        reader.read_to_string(&mut contents).unwrap();

        assert_eq!(contents, "hello world");
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let result = LocalFileReader::open(PathBuf::from("/nonexistent/file.csv"), 1024).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_directory() {
        let temp_dir = TempDir::new().unwrap();

        // Create some test files
        std::fs::write(temp_dir.path().join("b.csv"), "data1").unwrap();
        std::fs::write(temp_dir.path().join("a.CSV"), "data2").unwrap();
        std::fs::write(temp_dir.path().join("c.txt"), "data3").unwrap();

        // Create a subdirectory (should be skipped)
        std::fs::create_dir(temp_dir.path().join("subdir.csv")).unwrap();
        std::fs::write(temp_dir.path().join("subdir.csv/nested.csv"), "nested").unwrap();

        let results = list_directory(temp_dir.path()).await.unwrap();

        // Should have 3 files, not the subdirectory or nested file
        assert_eq!(results.len(), 3);

        let names: Vec<_> = results.iter().filter_map(|r| r.file_stem()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let csv: Vec<_> = results.iter().filter(|r| r.has_extension("csv")).collect();
        assert_eq!(csv.len(), 2);
        assert_eq!(csv[0].size(), 5);
    }

    #[tokio::test]
    async fn test_list_directory_empty() {
        let temp_dir = TempDir::new().unwrap();
        let results = list_directory(temp_dir.path()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_list_directory_not_found() {
        let result = list_directory(Path::new("/nonexistent/path")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_is_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("f.csv");
        std::fs::write(&file_path, "").unwrap();

        assert!(is_directory(temp_dir.path()).await);
        assert!(!is_directory(&file_path).await);
        assert!(!is_directory(Path::new("/nonexistent/path")).await);
    }
}
