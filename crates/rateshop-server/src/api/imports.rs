//! Workbook import handlers.
//!
//! - `POST   /api/v1/imports`          — multipart upload (`file` + `property_id`)
//! - `GET    /api/v1/imports`          — batch ledger, newest first
//! - `DELETE /api/v1/imports/{id}`     — drop a batch and its rates
//! - `GET    /api/v1/imports/template` — downloadable workbook template
//!
//! An upload runs the whole pipeline in one request: parse the workbook,
//! normalize rows, open a ledger batch, persist the accepted rows in one
//! transaction, finalize the batch with the counts. The rejected rows come
//! back in the receipt so the caller can fix the spreadsheet and retry.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rateshop_import::{normalize_rows, read_first_sheet};
use rateshop_store::{BatchFilter, ImportBatchRow};

use crate::middleware::RequestId;
use crate::uploads::sanitize_filename;

use super::properties::resolve_property;
use super::{map_store_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

const EXCEL_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

static RATE_TEMPLATE_XLSX: &[u8] = include_bytes!("../../assets/rate_template.xlsx");

// ---------------------------------------------------------------------------
// Request/response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct ImportReceipt {
    pub batch_id: i64,
    pub status: String,
    pub message: String,
    pub total_rows: i32,
    pub accepted_rows: i32,
    pub rejected_rows: i32,
    /// Capped row-error list, one human-readable string per rejected row.
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BatchListQuery {
    pub property_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Multipart plumbing
// ---------------------------------------------------------------------------

fn has_excel_extension(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.ends_with(".xlsx") || lower.ends_with(".xls")
}

/// Pulls the `file` and `property_id` fields out of the multipart body.
async fn read_upload(
    rid: &str,
    mut multipart: Multipart,
) -> Result<(String, Vec<u8>, i64), ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut property_id: Option<i64> = None;

    loop {
        let Some(field) = multipart.next_field().await.map_err(|e| {
            ApiError::new(rid, "bad_request", format!("malformed multipart body: {e}"))
        })?
        else {
            break;
        };

        let name = field.name().map(ToOwned::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map_or_else(|| "upload.xlsx".to_owned(), ToOwned::to_owned);
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::new(rid, "bad_request", format!("failed to read upload: {e}"))
                })?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("property_id") => {
                let raw = field.text().await.map_err(|e| {
                    ApiError::new(rid, "bad_request", format!("failed to read property_id: {e}"))
                })?;
                let parsed = raw.trim().parse::<i64>().map_err(|_| {
                    ApiError::new(
                        rid,
                        "validation_error",
                        format!("'property_id' must be an integer, got '{raw}'"),
                    )
                })?;
                property_id = Some(parsed);
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| {
        ApiError::new(rid, "validation_error", "multipart field 'file' is required")
    })?;
    let property_id = property_id.ok_or_else(|| {
        ApiError::new(
            rid,
            "validation_error",
            "multipart field 'property_id' is required",
        )
    })?;

    Ok((filename, bytes, property_id))
}

fn to_count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/imports — upload a rate workbook for one property.
pub(super) async fn upload_rates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ImportReceipt>>), ApiError> {
    let rid = &req_id.0;

    let (filename, bytes, property_id) = read_upload(rid, multipart).await?;

    if !has_excel_extension(&filename) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "only Excel files (.xlsx, .xls) are supported",
        ));
    }

    let property = resolve_property(state.store.as_ref(), property_id, rid).await?;

    let rows = read_first_sheet(&bytes)
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;
    let outcome = normalize_rows(&rows);

    let stored_name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(&filename));
    let batch = state
        .store
        .begin_import(property.id, &filename, Some(&stored_name))
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    if let Err(e) = state.uploads.save(&stored_name, &bytes).await {
        tracing::warn!(batch_id = batch.id, error = %e, "failed to retain uploaded workbook");
    }

    if let Err(e) = state
        .store
        .insert_rates(property.id, batch.id, &outcome.accepted)
        .await
    {
        if let Err(mark_err) = state
            .store
            .mark_import_failed(batch.id, "failed to persist accepted rows")
            .await
        {
            tracing::error!(batch_id = batch.id, error = %mark_err, "failed to mark batch as errored");
        }
        state.uploads.remove(&stored_name).await;
        return Err(map_store_error(rid.clone(), &e));
    }

    let total = to_count(outcome.total_rows());
    let accepted = to_count(outcome.accepted.len());
    let rejected = to_count(outcome.rejected.len());
    let errors = outcome.error_strings();

    let batch = state
        .store
        .finalize_import(batch.id, total, accepted, rejected, &errors)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    tracing::info!(
        batch_id = batch.id,
        property_id = property.id,
        total,
        accepted,
        rejected,
        status = %batch.status,
        "workbook import finished"
    );

    let receipt = ImportReceipt {
        batch_id: batch.id,
        status: batch.status,
        message: format!("Processed {total} rows: {accepted} imported, {rejected} rejected."),
        total_rows: total,
        accepted_rows: accepted,
        rejected_rows: rejected,
        errors,
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: receipt,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn list_import_batches(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BatchListQuery>,
) -> Result<Json<ApiResponse<Vec<ImportBatchRow>>>, ApiError> {
    let rows = state
        .store
        .list_import_batches(&BatchFilter {
            property_id: query.property_id,
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

/// DELETE /api/v1/imports/{id} — remove the batch, its rates, and its
/// retained workbook copy.
pub(super) async fn delete_import_batch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;

    let removed = state
        .store
        .delete_import_batch(id)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    if let Some(stored) = removed.stored_filename.as_deref() {
        state.uploads.remove(stored).await;
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/imports/template — the three-column starter workbook.
pub(super) async fn download_template() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, EXCEL_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"rate_template.xlsx\"",
            ),
        ],
        RATE_TEMPLATE_XLSX,
    )
}
