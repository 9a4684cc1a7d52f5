//! Canonical rate and import-batch vocabulary shared by the import pipeline,
//! both store backends, the HTTP service, and the CLI.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency applied when a spreadsheet carries none.
pub const DEFAULT_CURRENCY: &str = "BRL";

/// Sales channel applied when the channel column is absent or blank.
pub const DEFAULT_CHANNEL: &str = "Booking.com";

/// Room type applied when the room-type column is absent or blank.
pub const DEFAULT_ROOM_TYPE: &str = "Standard";

/// Cap on row-error strings retained per batch and returned to callers.
/// Rejected rows beyond the cap are still counted, just not itemized.
pub const MAX_REPORTED_ROW_ERRORS: usize = 10;

/// Exclusive upper bound on a nightly price. Matches the `NUMERIC(10, 2)`
/// column that stores it.
pub const MAX_PRICE_EXCLUSIVE: i64 = 100_000_000;

/// One validated nightly rate, ready to persist.
///
/// Invariants (enforced by the normalizer and by manual-entry validation):
/// `checkout_date > checkin_date`, `price >= 0` at 2-decimal scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRate {
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub price: Decimal,
    pub currency: String,
    pub channel: String,
    pub room_type: String,
}

/// Import-batch lifecycle. A batch is created as `Processing` before any rate
/// rows are written and moves exactly once to one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    Processing,
    Success,
    Error,
    SuccessWithErrors,
}

impl ImportStatus {
    /// Terminal status for a finalized batch. `Success` wins ties (an empty
    /// sheet imports zero rows with zero rejections).
    #[must_use]
    pub fn from_counts(accepted: i32, rejected: i32) -> Self {
        if rejected == 0 {
            ImportStatus::Success
        } else if accepted == 0 {
            ImportStatus::Error
        } else {
            ImportStatus::SuccessWithErrors
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ImportStatus::Processing => "processing",
            ImportStatus::Success => "success",
            ImportStatus::Error => "error",
            ImportStatus::SuccessWithErrors => "success_with_errors",
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_success_when_nothing_rejected() {
        assert_eq!(ImportStatus::from_counts(5, 0), ImportStatus::Success);
    }

    #[test]
    fn status_success_for_empty_sheet() {
        assert_eq!(ImportStatus::from_counts(0, 0), ImportStatus::Success);
    }

    #[test]
    fn status_error_when_nothing_accepted() {
        assert_eq!(ImportStatus::from_counts(0, 3), ImportStatus::Error);
    }

    #[test]
    fn status_mixed_when_both_present() {
        assert_eq!(
            ImportStatus::from_counts(1, 2),
            ImportStatus::SuccessWithErrors
        );
    }

    #[test]
    fn status_strings_match_ledger_values() {
        assert_eq!(ImportStatus::Processing.as_str(), "processing");
        assert_eq!(ImportStatus::Success.as_str(), "success");
        assert_eq!(ImportStatus::Error.as_str(), "error");
        assert_eq!(
            ImportStatus::SuccessWithErrors.as_str(),
            "success_with_errors"
        );
    }

    #[test]
    fn normalized_rate_serializes_price_as_string() {
        let rate = NormalizedRate {
            checkin_date: NaiveDate::from_ymd_opt(2025, 6, 17).unwrap(),
            checkout_date: NaiveDate::from_ymd_opt(2025, 6, 18).unwrap(),
            price: "174.15".parse().unwrap(),
            currency: DEFAULT_CURRENCY.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            room_type: DEFAULT_ROOM_TYPE.to_string(),
        };
        let value = serde_json::to_value(&rate).unwrap();
        assert_eq!(value["price"], serde_json::json!("174.15"));
        assert_eq!(value["checkin_date"], serde_json::json!("2025-06-17"));
        assert_eq!(value["channel"], serde_json::json!("Booking.com"));
    }
}
