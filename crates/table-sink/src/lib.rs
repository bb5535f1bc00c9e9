//! Destination table sink abstraction.
//!
//! This crate defines the `TableSink` trait that abstracts over the relational
//! database a census import writes into. `sqlite-sink` and `postgresql-sink`
//! implement it, so the CSV importer is written once against the trait.
//!
//! Shared SQL rendering (identifier quoting, DDL, INSERT statements) lives in
//! the `sql` module so every backend emits the same table layout.

pub mod sql;
mod traits;

pub use sql::InsertStatement;
pub use traits::TableSink;

/// Name of the synthetic auto-incrementing primary key column.
pub const ID_COLUMN: &str = "id";
