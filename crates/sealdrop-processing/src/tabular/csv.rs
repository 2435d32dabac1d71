use std::path::Path;

use csv::{ReaderBuilder, Trim};

use super::{column_name, unique_headers, DecodeError, Row};

/// Decode a delimited text file. The first record is the header.
///
/// Rows shorter than the header simply lack the trailing columns; longer rows
/// get `_{index}` names for the extra fields. Blank lines are skipped, but a
/// line of empty fields such as `,` is a row of empty strings.
pub fn decode_csv(path: &Path) -> Result<Vec<Row>, DecodeError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_path(path)?;

    let headers = unique_headers(reader.headers()?.iter());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = record
            .iter()
            .enumerate()
            .map(|(i, value)| (column_name(&headers, i), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}
