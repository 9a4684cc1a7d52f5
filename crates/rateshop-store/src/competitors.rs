//! Database operations for the `competitor_links` table.
//!
//! The relation is strictly directed: a row means "property tracks
//! competitor" and nothing about the reverse direction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::StoreError;

/// One tracked competitor, joined with the competitor property's details.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct CompetitorRow {
    /// The competitor property's id.
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub linked_at: DateTime<Utc>,
}

/// Inserts the directed edge if it does not exist. Returns `true` when a row
/// was created, `false` for the idempotent already-present case.
///
/// Endpoint existence and the self-reference check are handled by the store
/// implementations before this runs.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the insert fails.
pub async fn add_competitor(
    pool: &PgPool,
    property_id: i64,
    competitor_id: i64,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        "INSERT INTO competitor_links (property_id, competitor_id) \
         VALUES ($1, $2) \
         ON CONFLICT (property_id, competitor_id) DO NOTHING",
    )
    .bind(property_id)
    .bind(competitor_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Removes the directed edge.
///
/// # Errors
///
/// Returns [`StoreError::EdgeNotFound`] when no such edge exists,
/// [`StoreError::Sqlx`] if the delete fails.
pub async fn remove_competitor(
    pool: &PgPool,
    property_id: i64,
    competitor_id: i64,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "DELETE FROM competitor_links \
         WHERE property_id = $1 AND competitor_id = $2",
    )
    .bind(property_id)
    .bind(competitor_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::EdgeNotFound {
            property_id,
            competitor_id,
        });
    }

    Ok(())
}

/// Lists the properties tracked by `property_id`, ordered by name.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the query fails.
pub async fn list_competitors(
    pool: &PgPool,
    property_id: i64,
) -> Result<Vec<CompetitorRow>, StoreError> {
    let rows = sqlx::query_as::<_, CompetitorRow>(
        "SELECT p.id, p.name, p.location, c.created_at AS linked_at \
         FROM competitor_links c \
         JOIN properties p ON p.id = c.competitor_id \
         WHERE c.property_id = $1 \
         ORDER BY p.name ASC, p.id ASC",
    )
    .bind(property_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
