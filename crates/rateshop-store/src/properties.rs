//! Database operations for the `properties` table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::StoreError;

// ---------------------------------------------------------------------------
// Row and input types
// ---------------------------------------------------------------------------

/// A row from the `properties` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct PropertyRow {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub booking_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for property creation. `name` is already trimmed and non-empty;
/// blank optional fields arrive as `None`.
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub name: String,
    pub location: Option<String>,
    pub booking_url: Option<String>,
}

/// Full replace of the editable fields. `is_active: None` keeps the current
/// flag.
#[derive(Debug, Clone)]
pub struct UpdateProperty {
    pub name: String,
    pub location: Option<String>,
    pub booking_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Input filters for property listing.
///
/// `search` matches name or location as a case-insensitive substring;
/// `limit` is `None` to return all rows.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub search: Option<String>,
    pub active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Inserts a property and returns the full new row.
///
/// # Errors
///
/// Returns [`StoreError::DuplicateName`] when the unique name constraint
/// trips, [`StoreError::Sqlx`] for any other failure.
pub async fn create_property(pool: &PgPool, new: &NewProperty) -> Result<PropertyRow, StoreError> {
    let row = sqlx::query_as::<_, PropertyRow>(
        "INSERT INTO properties (name, location, booking_url) \
         VALUES ($1, $2, $3) \
         RETURNING id, name, location, booking_url, is_active, created_at, updated_at",
    )
    .bind(&new.name)
    .bind(new.location.as_deref())
    .bind(new.booking_url.as_deref())
    .fetch_one(pool)
    .await
    .map_err(|e| map_name_conflict(e, &new.name))?;

    Ok(row)
}

/// Fetches a property by id.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the query fails.
pub async fn get_property(pool: &PgPool, id: i64) -> Result<Option<PropertyRow>, StoreError> {
    let row = sqlx::query_as::<_, PropertyRow>(
        "SELECT id, name, location, booking_url, is_active, created_at, updated_at \
         FROM properties \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists properties ordered by name.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the query fails.
pub async fn list_properties(
    pool: &PgPool,
    filter: &PropertyFilter,
) -> Result<Vec<PropertyRow>, StoreError> {
    let rows = sqlx::query_as::<_, PropertyRow>(
        "SELECT id, name, location, booking_url, is_active, created_at, updated_at \
         FROM properties \
         WHERE ($1::TEXT IS NULL \
                OR name ILIKE '%' || $1 || '%' \
                OR location ILIKE '%' || $1 || '%') \
           AND ($2::BOOLEAN IS NULL OR is_active = $2) \
         ORDER BY name ASC, id ASC \
         LIMIT COALESCE($3, 9223372036854775807) \
         OFFSET $4",
    )
    .bind(filter.search.as_deref())
    .bind(filter.active)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Replaces a property's editable fields and bumps `updated_at`.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown id,
/// [`StoreError::DuplicateName`] when the new name collides with another
/// property, [`StoreError::Sqlx`] for any other failure.
pub async fn update_property(
    pool: &PgPool,
    id: i64,
    update: &UpdateProperty,
) -> Result<PropertyRow, StoreError> {
    let row = sqlx::query_as::<_, PropertyRow>(
        "UPDATE properties \
         SET name = $2, location = $3, booking_url = $4, \
             is_active = COALESCE($5, is_active), updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, name, location, booking_url, is_active, created_at, updated_at",
    )
    .bind(id)
    .bind(&update.name)
    .bind(update.location.as_deref())
    .bind(update.booking_url.as_deref())
    .bind(update.is_active)
    .fetch_optional(pool)
    .await
    .map_err(|e| map_name_conflict(e, &update.name))?
    .ok_or(StoreError::NotFound {
        entity: "property",
        id,
    })?;

    Ok(row)
}

/// Deletes a property row. Competitor edges and import batches cascade via
/// foreign keys; the rate-record guard lives in the store implementations.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown id, [`StoreError::Sqlx`]
/// if the delete fails.
pub async fn delete_property(pool: &PgPool, id: i64) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM properties WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "property",
            id,
        });
    }

    Ok(())
}

/// Maps a unique-violation on the property name (SQLSTATE 23505) to
/// [`StoreError::DuplicateName`]; everything else passes through.
fn map_name_conflict(err: sqlx::Error, name: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::DuplicateName {
                name: name.to_string(),
            };
        }
    }
    StoreError::Sqlx(err)
}
