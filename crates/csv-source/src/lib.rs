//! CSV census import module
//!
//! This module loads census CSV files into relational tables, one table per
//! file, through any [`table_sink::TableSink`] destination.
//!
//! Typical use is to build an [`ImportPlan`] from a [`Config`] before
//! connecting anywhere, then hand the plan and an open sink to [`sync`].

mod batch;
mod config;
mod error;
pub mod naming;
mod outcome;
mod plan;
mod progress;
mod row;
mod sync;

pub use batch::{write_batch, BatchOutcome, BatchWriter};
pub use config::{
    Config, ImportMode, DEFAULT_BATCH_SIZE, DEFAULT_CSV_DIR, DEFAULT_MAX_ERRORS,
    DEFAULT_SYNC_INTERVAL,
};
pub use error::ImportError;
pub use outcome::{FileOutcome, FileReport, ImportSession, ImportSummary, RunReport, SkipReason};
pub use plan::{ImportPlan, PlannedFile, CSV_EXTENSION};
pub use progress::ByteProgress;
pub use row::{fit_record, fit_row};
pub use sync::{process_file, sync};

// Re-export file source types for convenience
pub use censo_sync_file::{SourceFile, DEFAULT_BUFFER_SIZE};
