//! Database operations for the `rate_records` table.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use rateshop_core::NormalizedRate;

use crate::StoreError;

// ---------------------------------------------------------------------------
// Row and input types
// ---------------------------------------------------------------------------

/// A row from the `rate_records` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct RateRecordRow {
    pub id: i64,
    pub property_id: i64,
    /// `None` for manually-entered rates.
    pub import_batch_id: Option<i64>,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub price: Decimal,
    pub currency: String,
    pub channel: String,
    pub room_type: String,
    pub created_at: DateTime<Utc>,
}

/// Input filters for rate listing. Date bounds are inclusive and apply to
/// the check-in date; channel and room type match as case-insensitive
/// substrings; price bounds are inclusive. `limit` is `None` to return all
/// rows (the comparator needs the full range).
#[derive(Debug, Clone, Default)]
pub struct RateFilter {
    pub property_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub channel: Option<String>,
    pub room_type: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub limit: Option<i64>,
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Inserts a batch's accepted rows inside one transaction; either every row
/// lands or none do. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if any insert fails (the transaction rolls
/// back).
pub async fn insert_rates(
    pool: &PgPool,
    property_id: i64,
    batch_id: i64,
    rates: &[NormalizedRate],
) -> Result<u64, StoreError> {
    let mut tx = pool.begin().await?;
    let mut written: u64 = 0;

    for rate in rates {
        let result = sqlx::query(
            "INSERT INTO rate_records \
                 (property_id, import_batch_id, checkin_date, checkout_date, \
                  price, currency, channel, room_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(property_id)
        .bind(batch_id)
        .bind(rate.checkin_date)
        .bind(rate.checkout_date)
        .bind(rate.price)
        .bind(&rate.currency)
        .bind(&rate.channel)
        .bind(&rate.room_type)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

/// Inserts one manually-entered rate (no batch provenance).
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the insert fails.
pub async fn create_rate(
    pool: &PgPool,
    property_id: i64,
    rate: &NormalizedRate,
) -> Result<RateRecordRow, StoreError> {
    let row = sqlx::query_as::<_, RateRecordRow>(
        "INSERT INTO rate_records \
             (property_id, import_batch_id, checkin_date, checkout_date, \
              price, currency, channel, room_type) \
         VALUES ($1, NULL, $2, $3, $4, $5, $6, $7) \
         RETURNING id, property_id, import_batch_id, checkin_date, checkout_date, \
                   price, currency, channel, room_type, created_at",
    )
    .bind(property_id)
    .bind(rate.checkin_date)
    .bind(rate.checkout_date)
    .bind(rate.price)
    .bind(&rate.currency)
    .bind(&rate.channel)
    .bind(&rate.room_type)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Replaces a rate record's fields (the owning property never changes).
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown id, [`StoreError::Sqlx`]
/// if the update fails.
pub async fn update_rate(
    pool: &PgPool,
    id: i64,
    rate: &NormalizedRate,
) -> Result<RateRecordRow, StoreError> {
    let row = sqlx::query_as::<_, RateRecordRow>(
        "UPDATE rate_records \
         SET checkin_date = $2, checkout_date = $3, price = $4, \
             currency = $5, channel = $6, room_type = $7 \
         WHERE id = $1 \
         RETURNING id, property_id, import_batch_id, checkin_date, checkout_date, \
                   price, currency, channel, room_type, created_at",
    )
    .bind(id)
    .bind(rate.checkin_date)
    .bind(rate.checkout_date)
    .bind(rate.price)
    .bind(&rate.currency)
    .bind(&rate.channel)
    .bind(&rate.room_type)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound {
        entity: "rate record",
        id,
    })?;

    Ok(row)
}

/// Deletes a rate record.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown id, [`StoreError::Sqlx`]
/// if the delete fails.
pub async fn delete_rate(pool: &PgPool, id: i64) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM rate_records WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "rate record",
            id,
        });
    }

    Ok(())
}

/// Filtered rate listing, ordered by check-in date then id.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the query fails.
pub async fn query_rates(
    pool: &PgPool,
    filter: &RateFilter,
) -> Result<Vec<RateRecordRow>, StoreError> {
    let rows = sqlx::query_as::<_, RateRecordRow>(
        "SELECT id, property_id, import_batch_id, checkin_date, checkout_date, \
                price, currency, channel, room_type, created_at \
         FROM rate_records \
         WHERE ($1::BIGINT IS NULL OR property_id = $1) \
           AND ($2::DATE IS NULL OR checkin_date >= $2) \
           AND ($3::DATE IS NULL OR checkin_date <= $3) \
           AND ($4::TEXT IS NULL OR channel ILIKE '%' || $4 || '%') \
           AND ($5::TEXT IS NULL OR room_type ILIKE '%' || $5 || '%') \
           AND ($6::NUMERIC IS NULL OR price >= $6) \
           AND ($7::NUMERIC IS NULL OR price <= $7) \
         ORDER BY checkin_date ASC, id ASC \
         LIMIT COALESCE($8, 9223372036854775807) \
         OFFSET $9",
    )
    .bind(filter.property_id)
    .bind(filter.start_date)
    .bind(filter.end_date)
    .bind(filter.channel.as_deref())
    .bind(filter.room_type.as_deref())
    .bind(filter.min_price)
    .bind(filter.max_price)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Number of rate records owned by a property; guards hard deletion.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the query fails.
pub async fn count_rates_for_property(pool: &PgPool, property_id: i64) -> Result<i64, StoreError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM rate_records WHERE property_id = $1")
            .bind(property_id)
            .fetch_one(pool)
            .await?;

    Ok(count)
}
