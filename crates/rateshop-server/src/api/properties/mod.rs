//! Property catalog handlers.
//!
//! - `GET    /api/v1/properties`      — filtered listing
//! - `POST   /api/v1/properties`      — create
//! - `GET    /api/v1/properties/{id}` — single property
//! - `PUT    /api/v1/properties/{id}` — full update
//! - `DELETE /api/v1/properties/{id}` — hard delete, blocked while rates exist

mod write;

pub(super) use write::{create_property, delete_property, update_property};

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use rateshop_store::{PropertyFilter, PropertyRow, RateStore};

use crate::middleware::RequestId;

use super::{map_store_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

/// Resolve a property id to its row, returning 404 if not found.
pub(super) async fn resolve_property(
    store: &dyn RateStore,
    id: i64,
    request_id: &str,
) -> Result<PropertyRow, ApiError> {
    store
        .get_property(id)
        .await
        .map_err(|e| map_store_error(request_id.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(request_id, "not_found", format!("property {id} not found")))
}

#[derive(Debug, Deserialize)]
pub(super) struct PropertyListQuery {
    pub search: Option<String>,
    pub active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub(super) async fn list_properties(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PropertyListQuery>,
) -> Result<Json<ApiResponse<Vec<PropertyRow>>>, ApiError> {
    let rows = state
        .store
        .list_properties(&PropertyFilter {
            search: query.search,
            active: query.active,
            limit: Some(normalize_limit(query.limit)),
            offset: query.offset.unwrap_or(0).max(0),
        })
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_property(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<PropertyRow>>, ApiError> {
    let row = resolve_property(state.store.as_ref(), id, &req_id.0).await?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}
