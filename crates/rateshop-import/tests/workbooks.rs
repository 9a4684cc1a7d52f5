//! End-to-end fixture tests: real workbook bytes through the parser and the
//! normalizer. The fixtures are small hand-built `.xlsx` files checked in
//! under `tests/fixtures/`.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use rateshop_core::ImportStatus;
use rateshop_import::{normalize_rows, read_first_sheet, ImportError, RowErrorReason};

static CLEAN: &[u8] = include_bytes!("fixtures/rates_clean.xlsx");
static MIXED: &[u8] = include_bytes!("fixtures/rates_mixed.xlsx");
static EMPTY_SHEET: &[u8] = include_bytes!("fixtures/empty_sheet.xlsx");
static NO_SHEETS: &[u8] = include_bytes!("fixtures/no_sheets.xlsx");

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn clean_workbook_imports_both_rows() {
    let rows = read_first_sheet(CLEAN).unwrap();
    assert_eq!(rows.len(), 3, "header plus two data rows");

    let outcome = normalize_rows(&rows);
    assert_eq!(outcome.accepted.len(), 2);
    assert!(outcome.rejected.is_empty());
    assert_eq!(ImportStatus::from_counts(2, 0), ImportStatus::Success);

    let first = &outcome.accepted[0];
    assert_eq!(first.checkin_date, date(2025, 6, 17));
    assert_eq!(first.checkout_date, date(2025, 6, 18));
    assert_eq!(first.price, dec("174.15"));
    assert_eq!(first.channel, "Booking.com");
    assert_eq!(outcome.accepted[1].checkin_date, date(2025, 6, 18));
}

#[test]
fn mixed_workbook_accepts_and_rejects_per_row() {
    let rows = read_first_sheet(MIXED).unwrap();
    let outcome = normalize_rows(&rows);

    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(outcome.rejected.len(), 5);
    assert_eq!(outcome.total_rows(), 7);
    assert_eq!(
        ImportStatus::from_counts(2, 5),
        ImportStatus::SuccessWithErrors
    );

    // Row 2: full five-column row.
    let full = &outcome.accepted[0];
    assert_eq!(full.checkin_date, date(2025, 7, 1));
    assert_eq!(full.price, dec("200.50"));
    assert_eq!(full.channel, "Expedia");
    assert_eq!(full.room_type, "Deluxe");

    // Row 3: serial dates and a numeric price.
    let serial = &outcome.accepted[1];
    assert_eq!(serial.checkin_date, date(2025, 6, 17));
    assert_eq!(serial.checkout_date, date(2025, 6, 18));
    assert_eq!(serial.price, dec("174.15"));
    assert_eq!(serial.channel, "Booking.com");

    let rejected_rows: Vec<usize> = outcome.rejected.iter().map(|e| e.row).collect();
    assert_eq!(rejected_rows, vec![4, 5, 6, 7, 8]);
    assert!(matches!(
        outcome.rejected[0].reason,
        RowErrorReason::InvalidCheckin(_)
    ));
    assert!(matches!(
        outcome.rejected[1].reason,
        RowErrorReason::PriceNegative(_)
    ));
    assert_eq!(
        outcome.rejected[2].reason,
        RowErrorReason::CheckoutNotAfterCheckin
    );
    assert_eq!(outcome.rejected[3].reason, RowErrorReason::EmptyRow);
    assert_eq!(
        outcome.rejected[4].reason,
        RowErrorReason::TooFewColumns { populated: 2 }
    );
}

#[test]
fn empty_sheet_yields_an_empty_outcome_not_an_error() {
    let rows = read_first_sheet(EMPTY_SHEET).unwrap();
    assert!(rows.is_empty());
    let outcome = normalize_rows(&rows);
    assert_eq!(outcome.total_rows(), 0);
    assert_eq!(ImportStatus::from_counts(0, 0), ImportStatus::Success);
}

#[test]
fn workbook_without_sheets_is_rejected() {
    let result = read_first_sheet(NO_SHEETS);
    assert!(
        matches!(result, Err(ImportError::NoSheets)),
        "got: {result:?}"
    );
}

#[test]
fn garbage_bytes_are_rejected_before_any_rows_exist() {
    let result = read_first_sheet(b"PK\x03\x04 but not really a workbook");
    assert!(
        matches!(result, Err(ImportError::Workbook(_))),
        "got: {result:?}"
    );
}
