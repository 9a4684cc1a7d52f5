//! Rate-record handlers: filtered listing plus manual entry.
//!
//! - `GET    /api/v1/rates` — filtered listing
//! - `POST   /api/v1/rates` — manually enter a rate
//! - `PUT    /api/v1/rates/{id}` — replace a rate's stay, price, and labels
//! - `DELETE /api/v1/rates/{id}` — remove a rate
//!
//! Manual entries pass the same checks the import pipeline applies per row:
//! the stay spans at least one night and the price is a non-negative amount
//! rounded to the stored 2-decimal scale.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use rateshop_core::{
    NormalizedRate, DEFAULT_CHANNEL, DEFAULT_CURRENCY, DEFAULT_ROOM_TYPE, MAX_PRICE_EXCLUSIVE,
};
use rateshop_store::{RateFilter, RateRecordRow};

use crate::middleware::RequestId;

use super::{map_store_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct RateListQuery {
    pub property_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub channel: Option<String>,
    pub room_type: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateRateRequest {
    pub property_id: i64,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub price: Decimal,
    pub currency: Option<String>,
    pub channel: Option<String>,
    pub room_type: Option<String>,
}

/// PUT body: a full replacement. The owning property and any batch
/// provenance never change; absent or blank `currency`/`channel`/`room_type`
/// fall back to the defaults rather than keeping the stored values.
#[derive(Debug, Deserialize)]
pub(super) struct UpdateRateRequest {
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub price: Decimal,
    pub currency: Option<String>,
    pub channel: Option<String>,
    pub room_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_stay(req_id: &str, checkin: NaiveDate, checkout: NaiveDate) -> Result<(), ApiError> {
    if checkout <= checkin {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "check-out date must be after check-in date",
        ));
    }
    Ok(())
}

fn validate_price(req_id: &str, price: Decimal) -> Result<Decimal, ApiError> {
    if price < Decimal::ZERO {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "price must not be negative",
        ));
    }
    let price = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if price >= Decimal::from(MAX_PRICE_EXCLUSIVE) {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "price exceeds the supported range",
        ));
    }
    Ok(price)
}

fn validate_currency(req_id: &str, currency: Option<&str>) -> Result<String, ApiError> {
    let code = currency.map_or("", str::trim);
    if code.is_empty() {
        return Ok(DEFAULT_CURRENCY.to_owned());
    }
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "currency must be a three-letter code",
        ));
    }
    Ok(code.to_ascii_uppercase())
}

fn text_or_default(value: Option<String>, default: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_owned(),
        _ => default.to_owned(),
    }
}

fn validated_rate(
    req_id: &str,
    checkin_date: NaiveDate,
    checkout_date: NaiveDate,
    price: Decimal,
    currency: Option<String>,
    channel: Option<String>,
    room_type: Option<String>,
) -> Result<NormalizedRate, ApiError> {
    validate_stay(req_id, checkin_date, checkout_date)?;
    let price = validate_price(req_id, price)?;
    let currency = validate_currency(req_id, currency.as_deref())?;
    Ok(NormalizedRate {
        checkin_date,
        checkout_date,
        price,
        currency,
        channel: text_or_default(channel, DEFAULT_CHANNEL),
        room_type: text_or_default(room_type, DEFAULT_ROOM_TYPE),
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/rates — rows filtered by owner, stay window, channel,
/// room type, and price bounds; ordered by check-in date.
pub(super) async fn list_rates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RateListQuery>,
) -> Result<Json<ApiResponse<Vec<RateRecordRow>>>, ApiError> {
    let rid = &req_id.0;

    let filter = RateFilter {
        property_id: query.property_id,
        start_date: query.start_date,
        end_date: query.end_date,
        channel: query.channel,
        room_type: query.room_type,
        min_price: query.min_price,
        max_price: query.max_price,
        limit: Some(normalize_limit(query.limit)),
        offset: query.offset.unwrap_or(0).max(0),
    };

    let rows = state
        .store
        .query_rates(&filter)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/rates — manual entry; the stored row carries no batch
/// provenance. 404 for an unknown property comes from the store guard.
pub(super) async fn create_rate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateRateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RateRecordRow>>), ApiError> {
    let rid = &req_id.0;

    let rate = validated_rate(
        rid,
        body.checkin_date,
        body.checkout_date,
        body.price,
        body.currency,
        body.channel,
        body.room_type,
    )?;

    let row = state
        .store
        .create_rate(body.property_id, &rate)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PUT /api/v1/rates/{id} — replace the stay, price, and labels.
pub(super) async fn update_rate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRateRequest>,
) -> Result<Json<ApiResponse<RateRecordRow>>, ApiError> {
    let rid = &req_id.0;

    let rate = validated_rate(
        rid,
        body.checkin_date,
        body.checkout_date,
        body.price,
        body.currency,
        body.channel,
        body.room_type,
    )?;

    let row = state
        .store
        .update_rate(id, &rate)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/rates/{id}
pub(super) async fn delete_rate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;

    state
        .store
        .delete_rate(id)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn stay_must_span_a_night() {
        assert!(validate_stay("t", d(2026, 3, 10), d(2026, 3, 11)).is_ok());
        assert!(validate_stay("t", d(2026, 3, 10), d(2026, 3, 10)).is_err());
        assert!(validate_stay("t", d(2026, 3, 10), d(2026, 3, 9)).is_err());
    }

    #[test]
    fn price_rounds_half_away_from_zero() {
        let price = validate_price("t", Decimal::new(174_145, 3)).expect("valid price");
        assert_eq!(price, Decimal::new(174_15, 2));
    }

    #[test]
    fn price_bounds_are_enforced() {
        assert!(validate_price("t", Decimal::NEGATIVE_ONE).is_err());
        assert!(validate_price("t", Decimal::from(MAX_PRICE_EXCLUSIVE)).is_err());
        assert!(validate_price("t", Decimal::from(MAX_PRICE_EXCLUSIVE - 1)).is_ok());
    }

    #[test]
    fn currency_defaults_and_normalizes() {
        assert_eq!(validate_currency("t", None).unwrap(), DEFAULT_CURRENCY);
        assert_eq!(validate_currency("t", Some("  ")).unwrap(), DEFAULT_CURRENCY);
        assert_eq!(validate_currency("t", Some("usd")).unwrap(), "USD");
        assert!(validate_currency("t", Some("US")).is_err());
        assert!(validate_currency("t", Some("R$1")).is_err());
    }

    #[test]
    fn blank_labels_fall_back_to_defaults() {
        assert_eq!(text_or_default(None, DEFAULT_CHANNEL), "Booking.com");
        assert_eq!(text_or_default(Some("   ".into()), DEFAULT_CHANNEL), "Booking.com");
        assert_eq!(
            text_or_default(Some("  Expedia ".into()), DEFAULT_CHANNEL),
            "Expedia"
        );
    }
}
