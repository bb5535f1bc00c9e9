//! Fatal error categories for an import run.
//!
//! These are carried inside `anyhow::Error` and can be recovered with
//! `downcast_ref::<ImportError>()`. Anything that only affects one file is
//! reported through [`crate::FileOutcome`] instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    /// Single-file mode without a target table.
    #[error("a target table name is required when importing a single file")]
    MissingTable,

    /// The source directory does not exist or is not a directory.
    #[error("source directory {} does not exist", .0.display())]
    DirectoryNotFound(PathBuf),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The destination table could not be created; nothing more can be
    /// imported into it.
    #[error("failed to create table {table}: {reason}")]
    CreateTable { table: String, reason: String },
}
