use axum::extract::{Path, Query, State};
use axum::Json;

use crate::app_state::AppState;
use crate::error::TaggerResult;
use crate::models::api::{ImageTagsQuery, ImageTagsResponse, SearchResponse, StatsResponse};

/// GET /search/{tag} — images carrying exactly `tag`.
pub async fn search_by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> TaggerResult<Json<SearchResponse>> {
    let images = state.store.search_by_tag(&tag).await?;
    Ok(Json(SearchResponse {
        tag,
        found: images.len(),
        images,
    }))
}

/// GET /image/tags?path=... — stored record for one image.
pub async fn image_tags(
    State(state): State<AppState>,
    Query(query): Query<ImageTagsQuery>,
) -> TaggerResult<Json<ImageTagsResponse>> {
    let record = state.store.get(&query.path).await?;
    Ok(Json(ImageTagsResponse {
        image_path: query.path,
        found: record.is_some(),
        record,
    }))
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> TaggerResult<Json<StatsResponse>> {
    let stats = state.store.stats().await?;
    Ok(Json(StatsResponse {
        stats,
        engine: state.store.engine().to_string(),
        vocabulary_size: state.vocabulary.len(),
        translated_labels: state.translator.len(),
    }))
}
