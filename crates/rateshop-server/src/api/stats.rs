//! Workspace totals.
//!
//! - `GET /api/v1/stats` — entity counts plus the most recent import batch

use axum::{extract::State, Extension, Json};

use rateshop_store::StatsSummary;

use crate::middleware::RequestId;

use super::{map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// GET /api/v1/stats
pub(super) async fn get_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StatsSummary>>, ApiError> {
    let rid = &req_id.0;

    let summary = state
        .store
        .stats()
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: summary,
        meta: ResponseMeta::new(req_id.0),
    }))
}
