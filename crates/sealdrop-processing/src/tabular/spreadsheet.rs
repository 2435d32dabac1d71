use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};

use super::{column_name, unique_headers, DecodeError, Row};

/// Decode the first sheet of an `.xls`/`.xlsx` workbook.
pub fn decode_workbook(path: &Path) -> Result<Vec<Row>, DecodeError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| DecodeError::Workbook(e.to_string()))?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(DecodeError::NoSheets)?;

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| DecodeError::Workbook(e.to_string()))?;

    Ok(rows_from_range(&range))
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        other => Some(other.to_string()),
    }
}

/// First row is the header; blank cells are absent and blank rows skipped.
pub(crate) fn rows_from_range(range: &Range<Data>) -> Vec<Row> {
    let mut rows_iter = range.rows();

    let headers = match rows_iter.next() {
        Some(header_row) => {
            unique_headers(header_row.iter().map(|c| cell_text(c).unwrap_or_default()))
        }
        None => return Vec::new(),
    };

    rows_iter
        .filter_map(|cells| {
            let row: Row = cells
                .iter()
                .enumerate()
                .filter_map(|(i, cell)| cell_text(cell).map(|v| (column_name(&headers, i), v)))
                .collect();
            (!row.is_empty()).then_some(row)
        })
        .collect()
}
