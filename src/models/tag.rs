use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted tag set for one image, keyed uniquely by `image_path`.
///
/// `tags` keeps the ranking order produced by inference. Duplicates are
/// stored as given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagRecord {
    pub image_path: String,
    pub tags: Vec<String>,
    pub captured_at: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TagRecord {
    /// Exact, case-sensitive membership test.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Aggregate counters over the tag table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreStats {
    pub total_records: i64,
    pub records_with_capture_time: i64,
    pub oldest_created_at: Option<DateTime<Utc>>,
    pub newest_updated_at: Option<DateTime<Utc>>,
}

/// Liveness probe result. Unreachability is reported, never raised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreHealth {
    pub reachable: bool,
    pub record_count: Option<i64>,
    pub engine: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
