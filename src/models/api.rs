use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tag::{StoreHealth, StoreStats, TagRecord};

/// POST /tag/image body.
#[derive(Debug, Deserialize, Validate)]
pub struct TagImageRequest {
    /// Bounded by `db::MAX_IMAGE_PATH_CHARS`.
    #[garde(length(chars, min = 1, max = 768))]
    pub image_path: String,

    /// Use the whole configured vocabulary (default).
    #[garde(skip)]
    pub use_all_tags: Option<bool>,

    #[garde(skip)]
    pub custom_tags: Option<Vec<String>>,

    #[garde(range(min = 1, max = 100))]
    pub top_k: Option<usize>,
}

/// POST /tag/directory body.
#[derive(Debug, Deserialize, Validate)]
pub struct TagDirectoryRequest {
    #[garde(length(min = 1, max = 4096))]
    pub directory_path: String,

    #[garde(skip)]
    pub use_all_tags: Option<bool>,

    #[garde(skip)]
    pub custom_tags: Option<Vec<String>>,

    #[garde(skip)]
    pub file_extensions: Option<Vec<String>>,

    #[garde(skip)]
    pub recursive: Option<bool>,

    #[garde(range(min = 1, max = 100))]
    pub top_k: Option<usize>,

    #[garde(range(min = 1, max = 64))]
    pub group_size: Option<usize>,

    #[garde(range(max = 60_000))]
    pub pacing_delay_ms: Option<u64>,
}

/// Acknowledgement for a directory job started in the background.
#[derive(Debug, Serialize, Deserialize)]
pub struct DirectoryJobResponse {
    pub job_id: Uuid,
    pub message: String,
    pub directory: String,
    pub files_count: usize,
    pub tags_count: usize,
    pub top_k: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub tag: String,
    pub found: usize,
    pub images: Vec<TagRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ImageTagsQuery {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageTagsResponse {
    pub image_path: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<TagRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: StoreStats,
    pub engine: String,
    pub vocabulary_size: usize,
    pub translated_labels: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvailableTagsResponse {
    pub total_tags: usize,
    pub vocabulary: Vec<String>,
    pub display_tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: StoreHealth,
    pub vocabulary_size: usize,
}
