//! SQL text shared by all sinks.

use crate::ID_COLUMN;

/// Quote an identifier with double quotes, doubling any embedded quote.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Generate DROP TABLE statement.
pub fn generate_drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

/// Generate CREATE TABLE statement.
///
/// `id_definition` is the backend-specific type and constraint of the
/// synthetic key column, e.g. `INTEGER PRIMARY KEY AUTOINCREMENT`.
pub fn generate_create_table(table: &str, columns: &[String], id_definition: &str) -> String {
    let mut definitions = Vec::with_capacity(columns.len() + 1);
    definitions.push(format!("{} {id_definition}", quote_ident(ID_COLUMN)));
    definitions.extend(columns.iter().map(|c| format!("{} TEXT", quote_ident(c))));

    format!(
        "CREATE TABLE {} (\n  {}\n)",
        quote_ident(table),
        definitions.join(",\n  ")
    )
}

/// Parameterized INSERT for one destination table.
///
/// Built once per imported file; sinks render it with their own placeholder
/// syntax and cache the prepared form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    table: String,
    columns: Vec<String>,
}

impl InsertStatement {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Render the statement, calling `placeholder` with each 1-based
    /// parameter index.
    pub fn to_sql(&self, placeholder: impl Fn(usize) -> String) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=self.columns.len())
            .map(placeholder)
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            quote_ident(&self.table)
        )
    }
}
