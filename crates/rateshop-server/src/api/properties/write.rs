//! Property write handlers: create, update, delete.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use rateshop_store::{NewProperty, PropertyRow, UpdateProperty};

use crate::middleware::RequestId;

use super::super::{map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};
use super::resolve_property;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreatePropertyRequest {
    pub name: String,
    pub location: Option<String>,
    pub booking_url: Option<String>,
}

/// PUT body: a full replacement of the editable fields. An absent
/// `location`/`booking_url` clears the stored value; an absent `is_active`
/// keeps the current flag.
#[derive(Debug, Deserialize)]
pub(in crate::api) struct UpdatePropertyRequest {
    pub name: String,
    pub location: Option<String>,
    pub booking_url: Option<String>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_name(req_id: &str, name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.len() > 200 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "name must be 1–200 characters",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/properties — register a property.
pub(in crate::api) async fn create_property(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreatePropertyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PropertyRow>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim().to_owned();
    validate_name(rid, &name)?;

    let row = state
        .store
        .create_property(&NewProperty {
            name,
            location: body.location,
            booking_url: body.booking_url,
        })
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

/// PUT /api/v1/properties/{id} — replace a property's editable fields.
pub(in crate::api) async fn update_property(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePropertyRequest>,
) -> Result<Json<ApiResponse<PropertyRow>>, ApiError> {
    let rid = &req_id.0;
    resolve_property(state.store.as_ref(), id, rid).await?;

    let name = body.name.trim().to_owned();
    validate_name(rid, &name)?;

    let row = state
        .store
        .update_property(
            id,
            &UpdateProperty {
                name,
                location: body.location,
                booking_url: body.booking_url,
                is_active: body.is_active,
            },
        )
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/properties/{id} — hard delete; 409 while rates exist.
pub(in crate::api) async fn delete_property(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;

    state
        .store
        .delete_property(id)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
