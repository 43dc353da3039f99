use async_trait::async_trait;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySqlPool, Row};

use super::backend::{
    select_columns, stats_query, StorageBackend, StorageEngine, StoredRow, UpsertRow,
};
use super::{PoolSettings, MAX_IMAGE_PATH_CHARS, MAX_TAG_CHARS};
use crate::models::tag::StoreStats;

/// MySQL 8 engine: `JSON` tags with a multi-valued index and `MEMBER OF`.
pub struct MySqlBackend {
    pool: MySqlPool,
    table: String,
}

impl MySqlBackend {
    pub async fn connect(
        database_url: &str,
        table: &str,
        settings: &PoolSettings,
    ) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(1)
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(settings.idle_timeout)
            .max_lifetime(settings.max_lifetime)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(pool, table))
    }

    pub fn from_pool(pool: MySqlPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    fn map_row(row: &MySqlRow) -> Result<StoredRow, sqlx::Error> {
        Ok(StoredRow {
            image_path: row.try_get("image_path")?,
            tags_json: row.try_get("tags")?,
            captured_at: row.try_get("captured_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl StorageBackend for MySqlBackend {
    fn engine(&self) -> StorageEngine {
        StorageEngine::MySql
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn schema_statements(&self) -> Vec<String> {
        schema_sql(&self.table)
    }

    fn upsert_statement(&self) -> String {
        upsert_sql(&self.table)
    }

    fn containment_predicate(&self) -> String {
        "? MEMBER OF (tags)".to_string()
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for statement in self.schema_statements() {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn upsert(&self, row: &UpsertRow<'_>) -> Result<(), sqlx::Error> {
        sqlx::query(&self.upsert_statement())
            .bind(row.image_path)
            .bind(row.tags_json)
            .bind(row.captured_at)
            .bind(row.now)
            .bind(row.now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fetch_by_path(&self, image_path: &str) -> Result<Option<StoredRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM {} WHERE image_path = ?",
            select_columns("CAST(tags AS CHAR)"),
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(image_path)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    async fn fetch_containing(&self, tag: &str) -> Result<Vec<StoredRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY updated_at DESC",
            select_columns("CAST(tags AS CHAR)"),
            self.table,
            self.containment_predicate()
        );
        let rows = sqlx::query(&sql).bind(tag).fetch_all(&self.pool).await?;
        rows.iter().map(Self::map_row).collect()
    }

    async fn fetch_stats(&self) -> Result<StoreStats, sqlx::Error> {
        let row = sqlx::query(&stats_query(&self.table))
            .fetch_one(&self.pool)
            .await?;
        Ok(StoreStats {
            total_records: row.try_get("total_records")?,
            records_with_capture_time: row.try_get("records_with_capture_time")?,
            oldest_created_at: row.try_get("oldest_created_at")?,
            newest_updated_at: row.try_get("newest_updated_at")?,
        })
    }

    async fn count_records(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS total FROM {}", self.table))
            .fetch_one(&self.pool)
            .await?;
        row.try_get("total")
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// MySQL has no CREATE INDEX IF NOT EXISTS, so indexes live in the table body.
// Column widths follow the store-wide path and tag limits.
fn schema_sql(t: &str) -> Vec<String> {
    vec![format!(
        r#"
        CREATE TABLE IF NOT EXISTS {t} (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            image_path VARCHAR({MAX_IMAGE_PATH_CHARS}) NOT NULL,
            tags JSON NOT NULL,
            captured_at DATETIME NULL,
            created_at DATETIME(6) NOT NULL,
            updated_at DATETIME(6) NOT NULL,
            UNIQUE KEY uq_{t}_image_path (image_path),
            KEY idx_{t}_captured_at (captured_at),
            KEY idx_{t}_updated_at (updated_at),
            KEY idx_{t}_tags ((CAST(tags AS CHAR({MAX_TAG_CHARS}) ARRAY)))
        ) DEFAULT CHARSET = utf8mb4
        "#
    )]
}

// Row alias form; `VALUES(col)` in the update clause is deprecated since 8.0.20.
fn upsert_sql(t: &str) -> String {
    format!(
        r#"
        INSERT INTO {t} (image_path, tags, captured_at, created_at, updated_at)
        VALUES (?, CAST(? AS JSON), ?, ?, ?) AS incoming
        ON DUPLICATE KEY UPDATE
            tags = incoming.tags,
            captured_at = COALESCE(incoming.captured_at, {t}.captured_at),
            updated_at = incoming.updated_at
        "#
    )
}
