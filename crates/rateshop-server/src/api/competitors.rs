//! Competitor graph handlers.
//!
//! - `GET    /api/v1/properties/{id}/competitors` — tracked competitors
//! - `POST   /api/v1/properties/{id}/competitors` — add a directed edge
//! - `DELETE /api/v1/properties/{id}/competitors/{competitor_id}` — remove it

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use rateshop_store::CompetitorRow;

use crate::middleware::RequestId;

use super::properties::resolve_property;
use super::{map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct AddCompetitorRequest {
    pub competitor_id: i64,
}

pub(super) async fn list_competitors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<CompetitorRow>>>, ApiError> {
    let rid = &req_id.0;
    resolve_property(state.store.as_ref(), id, rid).await?;

    let rows = state
        .store
        .list_competitors(id)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST is idempotent: re-adding an existing edge reports `linked: false`
/// with a 200 instead of erroring.
pub(super) async fn add_competitor(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<AddCompetitorRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), ApiError> {
    let rid = &req_id.0;

    let created = state
        .store
        .add_competitor(id, body.competitor_id)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(ApiResponse {
            data: serde_json::json!({ "linked": created }),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn remove_competitor(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((id, competitor_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;

    state
        .store
        .remove_competitor(id, competitor_id)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "removed": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
