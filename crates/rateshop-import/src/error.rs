use thiserror::Error;

/// Workbook-level failures. Row-level problems are not errors; they surface
/// as [`crate::RowError`] values in the normalization outcome.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook has no sheets")]
    NoSheets,
}
