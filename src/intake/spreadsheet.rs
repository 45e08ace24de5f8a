// Excel workbooks (.xlsx and legacy .xls), first worksheet only.
//
// The first row is the header. Questions come from the "question" column
// if there is one, otherwise the first column, the same rule as CSV.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::UnsupportedFormatError;

pub fn questions_from_workbook(bytes: &[u8]) -> Result<Vec<String>, UnsupportedFormatError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(UnsupportedFormatError::EmptyWorkbook)??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let column = header
        .iter()
        .position(|cell| cell_text(cell).eq_ignore_ascii_case("question"))
        .unwrap_or(0);

    Ok(rows
        .filter_map(|row| row.get(column))
        .map(cell_text)
        .filter(|text| !text.is_empty())
        .collect())
}

/// Cell contents as trimmed text. Numbers and dates use their display form.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}
