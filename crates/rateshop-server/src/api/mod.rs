mod comparison;
mod competitors;
mod imports;
mod properties;
mod rates;
mod stats;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use rateshop_store::{RateStore, StoreError};

use crate::middleware::{request_id, RequestId};
use crate::uploads::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RateStore>,
    pub uploads: UploadStore,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    storage: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

/// Store failures that describe a client mistake keep their message; anything
/// infrastructural is logged and collapsed into an opaque 500.
pub(super) fn map_store_error(request_id: String, error: &StoreError) -> ApiError {
    match error {
        StoreError::NotFound { .. } | StoreError::EdgeNotFound { .. } => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        StoreError::DuplicateName { .. }
        | StoreError::PropertyHasRates { .. }
        | StoreError::InvalidBatchTransition { .. } => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        StoreError::SelfReference { .. } => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        StoreError::MissingDatabaseUrl | StoreError::Sqlx(_) | StoreError::Migration(_) => {
            tracing::error!(error = %error, "storage operation failed");
            ApiError::new(request_id, "internal_error", "storage operation failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn api_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/properties",
            get(properties::list_properties).post(properties::create_property),
        )
        .route(
            "/api/v1/properties/{id}",
            get(properties::get_property)
                .put(properties::update_property)
                .delete(properties::delete_property),
        )
        .route(
            "/api/v1/properties/{id}/competitors",
            get(competitors::list_competitors).post(competitors::add_competitor),
        )
        .route(
            "/api/v1/properties/{id}/competitors/{competitor_id}",
            delete(competitors::remove_competitor),
        )
        .route(
            "/api/v1/rates",
            get(rates::list_rates).post(rates::create_rate),
        )
        .route(
            "/api/v1/rates/{id}",
            put(rates::update_rate).delete(rates::delete_rate),
        )
        .route(
            "/api/v1/imports",
            get(imports::list_import_batches).post(imports::upload_rates),
        )
        .route("/api/v1/imports/template", get(imports::download_template))
        .route("/api/v1/imports/{id}", delete(imports::delete_import_batch))
        .route("/api/v1/comparison", get(comparison::compare_rates))
        .route("/api/v1/stats", get(stats::get_stats))
        // Workbook uploads exceed axum's 2 MB default body cap.
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

pub fn build_app(state: AppState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(state.max_upload_bytes))
        .layer(axum::middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors())
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    storage: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: storage unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        storage: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}
