//! Database operations for the `import_batches` ledger.
//!
//! A batch is inserted as `processing` before any rate rows reference it and
//! moves exactly once to a terminal status via [`finalize_import`] (or the
//! best-effort [`mark_import_failed`] on the persistence-failure path).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use rateshop_core::ImportStatus;

use crate::StoreError;

// ---------------------------------------------------------------------------
// Row and input types
// ---------------------------------------------------------------------------

/// A row from `import_batches`, joined with the owning property's name.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct ImportBatchRow {
    pub id: i64,
    pub property_id: i64,
    pub property_name: String,
    pub source_filename: String,
    /// Retained workbook copy under the upload directory; `None` for CLI
    /// imports, which keep no copy.
    pub stored_filename: Option<String>,
    pub status: String,
    pub total_rows: i32,
    pub accepted_rows: i32,
    pub rejected_rows: i32,
    /// JSON array of the capped row-error strings; `NULL` when every row
    /// was accepted.
    pub error_details: Option<serde_json::Value>,
    pub imported_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input filters for batch listing.
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub property_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Creates the `processing` batch row and returns it (with the property name
/// joined in).
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown property,
/// [`StoreError::Sqlx`] if the insert fails.
pub async fn begin_import(
    pool: &PgPool,
    property_id: i64,
    source_filename: &str,
    stored_filename: Option<&str>,
) -> Result<ImportBatchRow, StoreError> {
    if crate::properties::get_property(pool, property_id).await?.is_none() {
        return Err(StoreError::NotFound {
            entity: "property",
            id: property_id,
        });
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO import_batches (property_id, source_filename, stored_filename) \
         VALUES ($1, $2, $3) \
         RETURNING id",
    )
    .bind(property_id)
    .bind(source_filename)
    .bind(stored_filename)
    .fetch_one(pool)
    .await?;

    get_import_batch(pool, id)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "import batch",
            id,
        })
}

/// Finalizes a `processing` batch: sets the counts, the derived terminal
/// status, the capped error list, and `completed_at`.
///
/// # Errors
///
/// Returns [`StoreError::InvalidBatchTransition`] when the batch exists but
/// already left `processing`, [`StoreError::NotFound`] for an unknown batch,
/// [`StoreError::Sqlx`] if the update fails.
pub async fn finalize_import(
    pool: &PgPool,
    batch_id: i64,
    total_rows: i32,
    accepted_rows: i32,
    rejected_rows: i32,
    errors: &[String],
) -> Result<ImportBatchRow, StoreError> {
    let status = ImportStatus::from_counts(accepted_rows, rejected_rows);
    let error_details = if errors.is_empty() {
        None
    } else {
        Some(serde_json::json!(errors))
    };

    let result = sqlx::query(
        "UPDATE import_batches \
         SET status = $2, total_rows = $3, accepted_rows = $4, rejected_rows = $5, \
             error_details = $6, completed_at = NOW() \
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(batch_id)
    .bind(status.as_str())
    .bind(total_rows)
    .bind(accepted_rows)
    .bind(rejected_rows)
    .bind(error_details)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match get_import_batch(pool, batch_id).await? {
            Some(_) => Err(StoreError::InvalidBatchTransition {
                id: batch_id,
                expected: "processing",
            }),
            None => Err(StoreError::NotFound {
                entity: "import batch",
                id: batch_id,
            }),
        };
    }

    get_import_batch(pool, batch_id)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "import batch",
            id: batch_id,
        })
}

/// Best-effort `error` marking when persistence fails mid-import. A missing
/// or already-terminal batch is left untouched.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the update itself fails.
pub async fn mark_import_failed(
    pool: &PgPool,
    batch_id: i64,
    message: &str,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE import_batches \
         SET status = 'error', error_details = $2, completed_at = NOW() \
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(batch_id)
    .bind(serde_json::json!([message]))
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetches a batch by id.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the query fails.
pub async fn get_import_batch(
    pool: &PgPool,
    id: i64,
) -> Result<Option<ImportBatchRow>, StoreError> {
    let row = sqlx::query_as::<_, ImportBatchRow>(
        "SELECT b.id, b.property_id, p.name AS property_name, b.source_filename, \
                b.stored_filename, b.status, b.total_rows, b.accepted_rows, \
                b.rejected_rows, b.error_details, b.imported_at, b.completed_at \
         FROM import_batches b \
         JOIN properties p ON p.id = b.property_id \
         WHERE b.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists batches newest-first.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the query fails.
pub async fn list_import_batches(
    pool: &PgPool,
    filter: &BatchFilter,
) -> Result<Vec<ImportBatchRow>, StoreError> {
    let rows = sqlx::query_as::<_, ImportBatchRow>(
        "SELECT b.id, b.property_id, p.name AS property_name, b.source_filename, \
                b.stored_filename, b.status, b.total_rows, b.accepted_rows, \
                b.rejected_rows, b.error_details, b.imported_at, b.completed_at \
         FROM import_batches b \
         JOIN properties p ON p.id = b.property_id \
         WHERE ($1::BIGINT IS NULL OR b.property_id = $1) \
         ORDER BY b.imported_at DESC, b.id DESC \
         LIMIT COALESCE($2, 9223372036854775807) \
         OFFSET $3",
    )
    .bind(filter.property_id)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Deletes a batch and every rate record referencing it in one transaction.
/// Returns the deleted row so callers can remove the stored workbook.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown batch, [`StoreError::Sqlx`]
/// if any statement fails.
pub async fn delete_import_batch(pool: &PgPool, id: i64) -> Result<ImportBatchRow, StoreError> {
    let row = get_import_batch(pool, id)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "import batch",
            id,
        })?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM rate_records WHERE import_batch_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM import_batches WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(row)
}
