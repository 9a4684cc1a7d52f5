//! Comparative analysis endpoint.
//!
//! - `GET /api/v1/comparison?property_id=&start_date=&end_date=` — stats,
//!   per-date pivot, and insights for a property against its tracked
//!   competitors.
//!
//! The handler fetches each property's in-range rates through the store and
//! hands the series to the pure report builder; competitors with no rates in
//! the window still appear in the report, with null stats.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use rateshop_core::analysis::{
    build_comparison, ComparisonPeriod, ComparisonReport, PricePoint, PropertySeries,
};
use rateshop_store::{RateFilter, RateStore};

use crate::middleware::RequestId;

use super::properties::resolve_property;
use super::{map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ComparisonQuery {
    pub property_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// All three parameters are required; they are optional in the struct only
/// so a missing one yields a named validation error instead of a bare 400.
fn validate_query(
    req_id: &str,
    query: &ComparisonQuery,
) -> Result<(i64, ComparisonPeriod), ApiError> {
    let property_id = query.property_id.ok_or_else(|| {
        ApiError::new(
            req_id,
            "validation_error",
            "property_id query parameter is required",
        )
    })?;
    let start_date = query.start_date.ok_or_else(|| {
        ApiError::new(
            req_id,
            "validation_error",
            "start_date query parameter is required",
        )
    })?;
    let end_date = query.end_date.ok_or_else(|| {
        ApiError::new(
            req_id,
            "validation_error",
            "end_date query parameter is required",
        )
    })?;
    if end_date < start_date {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "end_date must not be before start_date",
        ));
    }
    Ok((
        property_id,
        ComparisonPeriod {
            start_date,
            end_date,
        },
    ))
}

async fn fetch_series(
    store: &dyn RateStore,
    req_id: &str,
    property_id: i64,
    name: String,
    period: ComparisonPeriod,
) -> Result<PropertySeries, ApiError> {
    let filter = RateFilter {
        property_id: Some(property_id),
        start_date: Some(period.start_date),
        end_date: Some(period.end_date),
        ..RateFilter::default()
    };
    let rows = store
        .query_rates(&filter)
        .await
        .map_err(|e| map_store_error(req_id.to_owned(), &e))?;

    Ok(PropertySeries {
        property_id,
        name,
        points: rows
            .into_iter()
            .map(|row| PricePoint {
                stay_date: row.checkin_date,
                price: row.price,
            })
            .collect(),
    })
}

/// GET /api/v1/comparison
pub(super) async fn compare_rates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Json<ApiResponse<ComparisonReport>>, ApiError> {
    let rid = &req_id.0;
    let store = state.store.as_ref();

    let (property_id, period) = validate_query(rid, &query)?;
    let focal_row = resolve_property(store, property_id, rid).await?;

    let links = store
        .list_competitors(property_id)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    let focal = fetch_series(store, rid, focal_row.id, focal_row.name, period).await?;
    let mut competitors = Vec::with_capacity(links.len());
    for link in links {
        competitors.push(fetch_series(store, rid, link.id, link.name, period).await?);
    }

    let report = build_comparison(&focal, &competitors, period);

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}
