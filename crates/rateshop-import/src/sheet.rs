//! First-sheet extraction: workbook bytes to rows of raw cell values.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::ImportError;

/// Raw cell content surfaced to the normalizer. Date serials stay numeric
/// here; interpreting them is the normalizer's job.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Empty cell or whitespace-only text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(t) => t.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

/// Read the first sheet of a workbook (`.xlsx`/`.xls`) as rows of raw cells,
/// top to bottom, header included. An empty sheet yields an empty vec.
///
/// # Errors
///
/// [`ImportError::Workbook`] when the bytes are not a readable workbook,
/// [`ImportError::NoSheets`] when the workbook contains no sheets.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::NoSheets)??;
    Ok(range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect())
}

// Spreadsheet integers stay far below 2^53, so the widening to f64 is exact.
#[allow(clippy::cast_precision_loss)]
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_detection_covers_whitespace_text() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("   ".to_string()).is_blank());
        assert!(!CellValue::Text("x".to_string()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn garbage_bytes_are_a_workbook_error() {
        let result = read_first_sheet(b"definitely not a spreadsheet");
        assert!(
            matches!(result, Err(ImportError::Workbook(_))),
            "got: {result:?}"
        );
    }

    #[test]
    fn numeric_cells_surface_unchanged() {
        assert_eq!(
            convert_cell(&Data::Float(45825.0)),
            CellValue::Number(45825.0)
        );
        assert_eq!(convert_cell(&Data::Int(45825)), CellValue::Number(45825.0));
    }

    #[test]
    fn error_cells_surface_as_empty() {
        assert_eq!(
            convert_cell(&Data::Error(calamine::CellErrorType::Div0)),
            CellValue::Empty
        );
    }
}
