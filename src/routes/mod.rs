use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::error::TaggerError;

pub mod health;
pub mod metrics;
pub mod search;
pub mod tagging;

impl IntoResponse for TaggerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TaggerError::NotFound(_) => StatusCode::NOT_FOUND,
            TaggerError::Configuration(_) => StatusCode::BAD_REQUEST,
            TaggerError::Inference(_) => StatusCode::BAD_GATEWAY,
            TaggerError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Request body failed `garde` validation.
pub(crate) fn invalid_request(report: garde::Report) -> TaggerError {
    TaggerError::Configuration(report.to_string())
}

/// Tagging, lookup and health endpoints.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/tag/image", post(tagging::tag_single_image))
        .route("/tag/directory", post(tagging::tag_directory))
        .route("/tags/available", get(tagging::available_tags))
        .route("/search/{tag}", get(search::search_by_tag))
        .route("/image/tags", get(search::image_tags))
        .route("/stats", get(search::stats))
        .with_state(state)
}
