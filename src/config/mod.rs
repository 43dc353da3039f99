use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::db::{PoolSettings, StorageEngine};
use crate::error::{TaggerError, TaggerResult};
use crate::services::translation::UnmappedLabels;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Connection string for the tag database.
    pub database_url: String,

    /// Engine override. Inferred from the `database_url` scheme when unset.
    pub storage_engine: Option<StorageEngine>,

    /// Table holding tag records. Created if absent; nothing else is touched.
    #[serde(default = "default_tag_table")]
    pub tag_table: String,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Zero-shot scoring endpoint.
    pub inference_url: String,

    /// Per-image limit on loading + scoring. Unset waits indefinitely.
    pub inference_timeout_secs: Option<u64>,

    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default = "default_group_size")]
    pub group_size: usize,

    /// Idle time between groups of a directory job.
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,

    #[serde(default = "default_max_image_side")]
    pub max_image_side: u32,

    /// Newline-separated label file. Built-in vocabulary otherwise.
    pub vocabulary_path: Option<PathBuf>,

    /// JSON object mapping inference labels to stored display labels.
    pub translation_path: Option<PathBuf>,

    #[serde(default)]
    pub drop_untranslated: bool,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_tag_table() -> String {
    "ai_photo_tags".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_top_k() -> usize {
    5
}

fn default_group_size() -> usize {
    5
}

fn default_pacing_delay_ms() -> u64 {
    500
}

fn default_max_image_side() -> u32 {
    1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Explicit engine, or the one named by the URL scheme.
    pub fn engine(&self) -> TaggerResult<StorageEngine> {
        self.storage_engine
            .or_else(|| StorageEngine::from_url(&self.database_url))
            .ok_or_else(|| {
                TaggerError::Configuration(
                    "cannot infer storage engine from DATABASE_URL; set STORAGE_ENGINE".to_string(),
                )
            })
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.db_max_connections.max(1),
            ..PoolSettings::default()
        }
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_secs.map(Duration::from_secs)
    }

    pub fn unmapped_labels(&self) -> UnmappedLabels {
        if self.drop_untranslated {
            UnmappedLabels::Drop
        } else {
            UnmappedLabels::PassThrough
        }
    }

    /// Reject defaults that would make every job fail at submission.
    pub fn validate(&self) -> TaggerResult<()> {
        if self.group_size == 0 {
            return Err(TaggerError::Configuration("GROUP_SIZE must be at least 1".to_string()));
        }
        if self.default_top_k == 0 {
            return Err(TaggerError::Configuration(
                "DEFAULT_TOP_K must be at least 1".to_string(),
            ));
        }
        crate::db::validate_table_name(&self.tag_table)?;
        self.engine().map(|_| ())
    }
}
