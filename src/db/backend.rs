use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::tag::StoreStats;

/// Database engines the tag store can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngine {
    Postgres,
    MySql,
    Sqlite,
}

impl StorageEngine {
    /// Guess the engine from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Some(StorageEngine::Postgres),
            "mysql" | "mariadb" => Some(StorageEngine::MySql),
            "sqlite" => Some(StorageEngine::Sqlite),
            _ => None,
        }
    }
}

/// Row as written by an upsert. Tags are already encoded as a JSON array.
#[derive(Debug, Clone)]
pub struct UpsertRow<'a> {
    pub image_path: &'a str,
    pub tags_json: &'a str,
    pub captured_at: Option<NaiveDateTime>,
    pub now: DateTime<Utc>,
}

/// Row as read back, before the tag array is decoded.
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub image_path: String,
    pub tags_json: String,
    pub captured_at: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One database engine behind the tag store.
///
/// Implementations own their connection pool and SQL dialect. The store only
/// sees encoded rows, so nothing above this trait branches on the engine.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn engine(&self) -> StorageEngine;

    fn table(&self) -> &str;

    /// Create-if-absent DDL, one statement per entry.
    fn schema_statements(&self) -> Vec<String>;

    /// Insert-or-update statement keyed on `image_path`.
    fn upsert_statement(&self) -> String;

    /// `WHERE` fragment selecting rows whose tag array holds the bound value.
    fn containment_predicate(&self) -> String;

    async fn init_schema(&self) -> Result<(), sqlx::Error>;

    async fn upsert(&self, row: &UpsertRow<'_>) -> Result<(), sqlx::Error>;

    async fn fetch_by_path(&self, image_path: &str) -> Result<Option<StoredRow>, sqlx::Error>;

    /// Rows the engine considers to contain `tag`. The store confirms exact
    /// membership on the decoded array before returning them.
    async fn fetch_containing(&self, tag: &str) -> Result<Vec<StoredRow>, sqlx::Error>;

    async fn fetch_stats(&self) -> Result<StoreStats, sqlx::Error>;

    async fn count_records(&self) -> Result<i64, sqlx::Error>;

    /// Release the pool. Later calls fail with `PoolClosed`.
    async fn close(&self);
}

/// Column list shared by every engine's `SELECT`.
pub(crate) fn select_columns(tags_expr: &str) -> String {
    format!("image_path, {tags_expr} AS tags, captured_at, created_at, updated_at")
}

pub(crate) fn stats_query(table: &str) -> String {
    format!(
        "SELECT COUNT(*) AS total_records, \
                COUNT(captured_at) AS records_with_capture_time, \
                MIN(created_at) AS oldest_created_at, \
                MAX(updated_at) AS newest_updated_at \
         FROM {table}"
    )
}
