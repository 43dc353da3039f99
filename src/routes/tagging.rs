use axum::extract::State;
use axum::Json;
use garde::Validate;
use std::path::PathBuf;
use std::time::Duration;

use super::invalid_request;
use crate::app_state::AppState;
use crate::error::{TaggerError, TaggerResult};
use crate::models::api::{
    AvailableTagsResponse, DirectoryJobResponse, TagDirectoryRequest, TagImageRequest,
};
use crate::models::job::{BatchJob, PerImageOutcome};
use crate::services::scanner::{discover_images, DEFAULT_EXTENSIONS};

/// POST /tag/image — tag one image and return its outcome.
pub async fn tag_single_image(
    State(state): State<AppState>,
    Json(request): Json<TagImageRequest>,
) -> TaggerResult<Json<PerImageOutcome>> {
    request.validate().map_err(invalid_request)?;

    let candidate_tags =
        state.candidate_tags(request.use_all_tags, request.custom_tags.as_deref());
    let top_k = request.top_k.unwrap_or(state.defaults.top_k);

    tracing::info!(
        image_path = %request.image_path,
        candidates = candidate_tags.len(),
        top_k = top_k,
        "Tagging single image"
    );

    let outcome = state
        .orchestrator
        .tag_one(&request.image_path, candidate_tags, top_k)
        .await?;
    Ok(Json(outcome))
}

/// POST /tag/directory — start a background job over a directory.
///
/// Responds as soon as the job is accepted; per-image results land in the
/// store as groups complete.
pub async fn tag_directory(
    State(state): State<AppState>,
    Json(request): Json<TagDirectoryRequest>,
) -> TaggerResult<Json<DirectoryJobResponse>> {
    request.validate().map_err(invalid_request)?;

    let extensions = request
        .file_extensions
        .clone()
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect());
    let directory = PathBuf::from(&request.directory_path);
    let recursive = request.recursive.unwrap_or(false);

    let files =
        tokio::task::spawn_blocking(move || discover_images(&directory, &extensions, recursive))
            .await
            .map_err(|e| TaggerError::NotFound(format!("directory scan aborted: {e}")))??;

    if files.is_empty() {
        return Err(TaggerError::NotFound(format!(
            "no images found in {}",
            request.directory_path
        )));
    }

    let candidate_tags =
        state.candidate_tags(request.use_all_tags, request.custom_tags.as_deref());
    let images: Vec<String> = files
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();

    let job = BatchJob::new(
        images,
        candidate_tags,
        request.top_k.unwrap_or(state.defaults.top_k),
        request.group_size.unwrap_or(state.defaults.group_size),
        request
            .pacing_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(state.defaults.pacing_delay),
    )?;

    let response = DirectoryJobResponse {
        job_id: job.id(),
        message: format!("Started tagging {} images", job.images().len()),
        directory: request.directory_path.clone(),
        files_count: job.images().len(),
        tags_count: job.candidate_tags().len(),
        top_k: job.top_k(),
    };

    tracing::info!(
        job_id = %response.job_id,
        directory = %response.directory,
        files = response.files_count,
        "Directory job accepted"
    );

    // The job outlives this request.
    state.orchestrator.start_detached(job);

    Ok(Json(response))
}

/// GET /tags/available — vocabulary and the labels it is stored as.
pub async fn available_tags(State(state): State<AppState>) -> Json<AvailableTagsResponse> {
    let vocabulary = state.vocabulary.to_vec();
    let display_tags = state.translator.translate(&vocabulary);
    Json(AvailableTagsResponse {
        total_tags: vocabulary.len(),
        vocabulary,
        display_tags,
    })
}
