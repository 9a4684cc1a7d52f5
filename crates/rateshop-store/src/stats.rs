//! Aggregate counts for the dashboard endpoint.

use serde::Serialize;
use sqlx::PgPool;

use crate::import_batches::ImportBatchRow;
use crate::StoreError;

/// Totals across the whole store plus the most recent import, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_properties: i64,
    pub total_rate_records: i64,
    pub total_competitor_links: i64,
    pub total_import_batches: i64,
    pub last_import: Option<ImportBatchRow>,
}

#[derive(Debug, sqlx::FromRow)]
struct CountsRow {
    total_properties: i64,
    total_rate_records: i64,
    total_competitor_links: i64,
    total_import_batches: i64,
}

/// Store-wide totals in one round trip, plus the latest batch.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if either query fails.
pub async fn stats(pool: &PgPool) -> Result<StatsSummary, StoreError> {
    let counts = sqlx::query_as::<_, CountsRow>(
        "SELECT \
            (SELECT COUNT(*) FROM properties)       AS total_properties, \
            (SELECT COUNT(*) FROM rate_records)     AS total_rate_records, \
            (SELECT COUNT(*) FROM competitor_links) AS total_competitor_links, \
            (SELECT COUNT(*) FROM import_batches)   AS total_import_batches",
    )
    .fetch_one(pool)
    .await?;

    let last_import = sqlx::query_as::<_, ImportBatchRow>(
        "SELECT \
            b.id, b.property_id, p.name AS property_name, b.source_filename, \
            b.stored_filename, b.status, b.total_rows, b.accepted_rows, \
            b.rejected_rows, b.error_details, b.imported_at, b.completed_at \
         FROM import_batches b \
         JOIN properties p ON p.id = b.property_id \
         ORDER BY b.imported_at DESC, b.id DESC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(StatsSummary {
        total_properties: counts.total_properties,
        total_rate_records: counts.total_rate_records,
        total_competitor_links: counts.total_competitor_links,
        total_import_batches: counts.total_import_batches,
        last_import,
    })
}
