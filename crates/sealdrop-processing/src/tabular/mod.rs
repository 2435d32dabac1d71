//! Tabular decoding
//!
//! CSV and workbook files decode into the same shape: one [`Row`] per data
//! row, keyed by header name, in file order. Decoding is synchronous and runs
//! on the blocking pool.

mod csv;
mod spreadsheet;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

pub use self::csv::decode_csv;
pub use self::spreadsheet::decode_workbook;

/// Column name to raw value. Missing cells are absent.
pub type Row = BTreeMap<String, String>;

/// Name used for blank header cells.
pub(crate) const EMPTY_HEADER: &str = "__EMPTY";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed CSV: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("unreadable workbook: {0}")]
    Workbook(String),

    #[error("workbook has no sheets")]
    NoSheets,

    #[error("unsupported tabular extension: {0}")]
    UnsupportedExtension(String),

    #[error("decoder task failed: {0}")]
    Task(String),
}

/// Decode `path` according to its (lowercased) extension.
pub async fn decode_file(path: PathBuf, extension: String) -> Result<Vec<Row>, DecodeError> {
    let started = std::time::Instant::now();

    let rows = tokio::task::spawn_blocking(move || match extension.as_str() {
        "csv" => decode_csv(&path),
        "xls" | "xlsx" => decode_workbook(&path),
        other => Err(DecodeError::UnsupportedExtension(other.to_string())),
    })
    .await
    .map_err(|e| DecodeError::Task(e.to_string()))??;

    tracing::debug!(
        rows = rows.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Decoded tabular file"
    );

    Ok(rows)
}

/// Trim header names, name blanks `__EMPTY`, and suffix repeats with `_{n}`.
pub(crate) fn unique_headers<I>(raw: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .map(|h| {
            let trimmed = h.as_ref().trim().trim_start_matches('\u{feff}').trim();
            let base = if trimmed.is_empty() {
                EMPTY_HEADER.to_string()
            } else {
                trimmed.to_string()
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{}_{}", base, count)
            };
            *count += 1;
            name
        })
        .collect()
}

/// Column name for index `i` of a row, `_{i}` past the end of the header.
pub(crate) fn column_name(headers: &[String], i: usize) -> String {
    headers.get(i).cloned().unwrap_or_else(|| format!("_{}", i))
}
