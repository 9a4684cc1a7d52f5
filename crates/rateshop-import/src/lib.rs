//! Spreadsheet import pipeline: workbook bytes to normalized rate records.
//!
//! Two stages, both pure:
//! - [`sheet::read_first_sheet`] extracts the first sheet as rows of the raw
//!   [`CellValue`] union, surfacing date serials unchanged.
//! - [`normalize::normalize_rows`] applies the positional column contract and
//!   turns each data row into a [`rateshop_core::NormalizedRate`] or a
//!   [`RowError`] with a spreadsheet row number. Rejected rows never abort
//!   the run.

pub mod error;
pub mod normalize;
pub mod sheet;

pub use error::ImportError;
pub use normalize::{normalize_rows, ImportOutcome, RowError, RowErrorReason};
pub use sheet::{read_first_sheet, CellValue};
