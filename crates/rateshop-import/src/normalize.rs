//! Positional row normalization: raw cells to [`NormalizedRate`]s plus
//! per-row rejections.
//!
//! Column contract (the first row is the header and is skipped here):
//! `[0]` check-in, `[1]` check-out, `[2]` price, `[3]` channel (optional),
//! `[4]` room type (optional). Dates accept spreadsheet serials,
//! `DD/MM/YYYY`, `YYYY-MM-DD`, and `DD-MM-YYYY`; prices accept a comma as
//! the decimal separator. A rejected row is counted and reported, never
//! silently skipped, and never aborts the run.

use chrono::{Days, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use rateshop_core::{
    NormalizedRate, DEFAULT_CHANNEL, DEFAULT_CURRENCY, DEFAULT_ROOM_TYPE, MAX_PRICE_EXCLUSIVE,
    MAX_REPORTED_ROW_ERRORS,
};

use crate::sheet::CellValue;

// Largest serial accepted: 9999-12-31. Day 0 of the epoch is 1899-12-30.
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

const EMPTY_CELL: CellValue = CellValue::Empty;

/// Why a data row was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowErrorReason {
    EmptyRow,
    TooFewColumns { populated: usize },
    InvalidCheckin(String),
    InvalidCheckout(String),
    CheckoutNotAfterCheckin,
    PriceNotNumeric(String),
    PriceNegative(String),
    PriceOutOfRange(String),
}

impl std::fmt::Display for RowErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowErrorReason::EmptyRow => write!(f, "empty row"),
            RowErrorReason::TooFewColumns { populated } => {
                write!(f, "only {populated} populated columns, need at least 3")
            }
            RowErrorReason::InvalidCheckin(raw) => write!(f, "invalid check-in date '{raw}'"),
            RowErrorReason::InvalidCheckout(raw) => write!(f, "invalid check-out date '{raw}'"),
            RowErrorReason::CheckoutNotAfterCheckin => {
                write!(f, "check-out date must be after check-in date")
            }
            RowErrorReason::PriceNotNumeric(raw) => write!(f, "invalid price '{raw}'"),
            RowErrorReason::PriceNegative(raw) => write!(f, "negative price '{raw}'"),
            RowErrorReason::PriceOutOfRange(raw) => {
                write!(f, "price '{raw}' exceeds the supported range")
            }
        }
    }
}

/// One rejected row, numbered the way the spreadsheet displays it (1-based,
/// header included): data row `i` reports as row `i + 2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row: usize,
    pub reason: RowErrorReason,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row, self.reason)
    }
}

/// Outcome of normalizing a sheet's data rows.
/// `accepted.len() + rejected.len()` always equals the number of data rows.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub accepted: Vec<NormalizedRate>,
    pub rejected: Vec<RowError>,
}

impl ImportOutcome {
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }

    /// Row-error strings for callers, capped at [`MAX_REPORTED_ROW_ERRORS`].
    /// Rows rejected beyond the cap are still counted in `rejected`.
    #[must_use]
    pub fn error_strings(&self) -> Vec<String> {
        self.rejected
            .iter()
            .take(MAX_REPORTED_ROW_ERRORS)
            .map(ToString::to_string)
            .collect()
    }
}

/// Normalize every data row of `rows`. `rows[0]` is the header and is
/// skipped; an empty slice (or header-only sheet) yields an empty outcome.
#[must_use]
pub fn normalize_rows(rows: &[Vec<CellValue>]) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    for (idx, row) in rows.iter().skip(1).enumerate() {
        let row_number = idx + 2;
        match normalize_row(row) {
            Ok(rate) => outcome.accepted.push(rate),
            Err(reason) => outcome.rejected.push(RowError {
                row: row_number,
                reason,
            }),
        }
    }
    outcome
}

fn normalize_row(row: &[CellValue]) -> Result<NormalizedRate, RowErrorReason> {
    let populated = row.iter().filter(|cell| !cell.is_blank()).count();
    if populated == 0 {
        return Err(RowErrorReason::EmptyRow);
    }
    if populated < 3 {
        return Err(RowErrorReason::TooFewColumns { populated });
    }

    let checkin_cell = cell_at(row, 0);
    let checkin_date = parse_date_cell(checkin_cell)
        .ok_or_else(|| RowErrorReason::InvalidCheckin(cell_text(checkin_cell)))?;

    let checkout_cell = cell_at(row, 1);
    let checkout_date = parse_date_cell(checkout_cell)
        .ok_or_else(|| RowErrorReason::InvalidCheckout(cell_text(checkout_cell)))?;

    if checkout_date <= checkin_date {
        return Err(RowErrorReason::CheckoutNotAfterCheckin);
    }

    let price = parse_price_cell(cell_at(row, 2))?;

    Ok(NormalizedRate {
        checkin_date,
        checkout_date,
        price,
        currency: DEFAULT_CURRENCY.to_string(),
        channel: text_or_default(cell_at(row, 3), DEFAULT_CHANNEL),
        room_type: text_or_default(cell_at(row, 4), DEFAULT_ROOM_TYPE),
    })
}

fn cell_at(row: &[CellValue], idx: usize) -> &CellValue {
    row.get(idx).unwrap_or(&EMPTY_CELL)
}

fn cell_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty => String::new(),
        CellValue::Text(t) => t.trim().to_string(),
        CellValue::Number(n) => n.to_string(),
    }
}

fn parse_date_cell(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Number(serial) => date_from_serial(*serial),
        CellValue::Text(raw) => parse_date_text(raw),
        CellValue::Empty => None,
    }
}

/// Spreadsheet serial dates count days from 1899-12-30; fractional time is
/// truncated.
// Truncation/sign casts are guarded by the range check above them.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_DATE_SERIAL {
        return None;
    }
    let days = serial.trunc() as u64;
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days))
}

/// Slash-separated dates are `DD/MM/YYYY`; anything else tries `YYYY-MM-DD`
/// then `DD-MM-YYYY`.
fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.contains('/') {
        return NaiveDate::parse_from_str(trimmed, "%d/%m/%Y").ok();
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d-%m-%Y"))
        .ok()
}

fn parse_price_cell(cell: &CellValue) -> Result<Decimal, RowErrorReason> {
    let parsed = match cell {
        CellValue::Number(value) => Decimal::from_f64(*value),
        CellValue::Text(raw) => raw.trim().replace(',', ".").parse::<Decimal>().ok(),
        CellValue::Empty => None,
    };
    let Some(price) = parsed else {
        return Err(RowErrorReason::PriceNotNumeric(cell_text(cell)));
    };
    if price < Decimal::ZERO {
        return Err(RowErrorReason::PriceNegative(cell_text(cell)));
    }
    let price = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if price >= Decimal::from(MAX_PRICE_EXCLUSIVE) {
        return Err(RowErrorReason::PriceOutOfRange(cell_text(cell)));
    }
    Ok(price)
}

fn text_or_default(cell: &CellValue, default: &str) -> String {
    match cell {
        CellValue::Text(t) if !t.trim().is_empty() => t.trim().to_string(),
        _ => default.to_string(),
    }
}
