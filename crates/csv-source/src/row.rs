//! Row shape correction.

use csv::StringRecord;

/// Coerce a record to exactly `width` values: short records are padded with
/// empty strings at the end, long ones are truncated.
pub fn fit_row<'a, I>(values: I, width: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut row: Vec<String> = values.into_iter().take(width).map(str::to_string).collect();
    row.resize(width, String::new());
    row
}

/// [`fit_row`] for a parsed CSV record.
pub fn fit_record(record: &StringRecord, width: usize) -> Vec<String> {
    fit_row(record.iter(), width)
}
