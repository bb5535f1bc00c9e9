//! Column and table identifiers derived from census file contents and names.

use std::path::Path;

/// Default namespace prefix for derived table names.
pub const DEFAULT_TABLE_PREFIX: &str = "censo_";

/// Separator between the entity and the description in census file names,
/// e.g. `Base de Datos de Poblacion - Resumen`.
const NAME_SEPARATOR: &str = " - ";

/// Phrase removed from the entity part of a census file name.
const ENTITY_PHRASE: &str = "Base de Datos de ";

const ACCENTS: [(char, char); 14] = [
    ('á', 'a'),
    ('é', 'e'),
    ('í', 'i'),
    ('ó', 'o'),
    ('ú', 'u'),
    ('Á', 'A'),
    ('É', 'E'),
    ('Í', 'I'),
    ('Ó', 'O'),
    ('Ú', 'U'),
    ('ñ', 'n'),
    ('Ñ', 'N'),
    ('ü', 'u'),
    ('Ü', 'U'),
];

/// Replace Spanish accented letters with their unaccented ASCII form.
pub fn strip_accents(text: &str) -> String {
    text.chars()
        .map(|c| {
            ACCENTS
                .iter()
                .find(|(accented, _)| *accented == c)
                .map(|(_, plain)| *plain)
                .unwrap_or(c)
        })
        .collect()
}

fn is_placeholder(name: &str) -> bool {
    name.is_empty() || name.chars().all(|c| c.is_ascii_digit())
}

/// Turn a raw header field at zero-based `position` into a column name.
///
/// Empty and purely numeric headers become `col_<position + 1>`. Everything
/// else is lower-cased with spaces, hyphens and periods turned into
/// underscores, parentheses removed and accents stripped. A header that
/// normalizes down to nothing or to digits (such as `(12)`) also becomes
/// `col_<position + 1>`, so normalizing a normalized name changes nothing.
pub fn normalize_column(raw: &str, position: usize) -> String {
    let placeholder = || format!("col_{}", position + 1);

    let trimmed = raw.trim();
    if is_placeholder(trimmed) {
        return placeholder();
    }

    let name: String = trimmed
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '(' | ')'))
        .map(|c| match c {
            ' ' | '-' | '.' => '_',
            other => other,
        })
        .collect();
    let name = strip_accents(&name);
    let name = name.trim();

    if is_placeholder(name) {
        placeholder()
    } else {
        name.to_string()
    }
}

/// Normalize a whole header row. Duplicates are kept as they are.
pub fn normalize_columns<I, S>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| normalize_column(h.as_ref(), i))
        .collect()
}

/// Derive a table name from a file base name (no extension).
///
/// Only the part before the first `" - "` is used when the name has one, so
/// `Base de Datos de Hogar - Parte 1` and `Base de Datos de Hogar - Parte 2`
/// both map to `<prefix>hogar`.
pub fn derive_table_name(base_name: &str, prefix: &str) -> String {
    let parts: Vec<&str> = base_name.split(NAME_SEPARATOR).collect();

    let stem = if parts.len() < 2 {
        base_name.to_lowercase().replace(' ', "_")
    } else {
        parts[0]
            .replace(ENTITY_PHRASE, "")
            .to_lowercase()
            .replace(' ', "_")
    };

    format!("{prefix}{}", strip_accents(&stem))
}

/// Derive a table name from a file path's stem.
pub fn table_name_for_path(path: &Path, prefix: &str) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| derive_table_name(stem, prefix))
}
