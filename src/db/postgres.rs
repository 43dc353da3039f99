use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use super::backend::{
    select_columns, stats_query, StorageBackend, StorageEngine, StoredRow, UpsertRow,
};
use super::PoolSettings;
use crate::models::tag::StoreStats;

/// PostgreSQL engine: `JSONB` tags with a GIN index and `@>` containment.
pub struct PostgresBackend {
    pool: PgPool,
    table: String,
}

impl PostgresBackend {
    pub async fn connect(
        database_url: &str,
        table: &str,
        settings: &PoolSettings,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(1)
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(settings.idle_timeout)
            .max_lifetime(settings.max_lifetime)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(pool, table))
    }

    pub fn from_pool(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    fn map_row(row: &PgRow) -> Result<StoredRow, sqlx::Error> {
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
impl StorageBackend for PostgresBackend {
    fn engine(&self) -> StorageEngine {
        StorageEngine::Postgres
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn schema_statements(&self) -> Vec<String> {
        let t = &self.table;
        vec![
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {t} (
                    id BIGSERIAL PRIMARY KEY,
                    image_path TEXT NOT NULL UNIQUE,
                    tags JSONB NOT NULL,
                    captured_at TIMESTAMP,
                    created_at TIMESTAMPTZ NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL
                )
                "#
            ),
            format!("CREATE INDEX IF NOT EXISTS idx_{t}_tags ON {t} USING GIN (tags)"),
            format!("CREATE INDEX IF NOT EXISTS idx_{t}_captured_at ON {t} (captured_at)"),
            format!("CREATE INDEX IF NOT EXISTS idx_{t}_updated_at ON {t} (updated_at)"),
        ]
    }

    fn upsert_statement(&self) -> String {
        let t = &self.table;
        format!(
            r#"
            INSERT INTO {t} (image_path, tags, captured_at, created_at, updated_at)
            VALUES ($1, $2::jsonb, $3, $4, $4)
            ON CONFLICT (image_path)
            DO UPDATE SET
                tags = EXCLUDED.tags,
                captured_at = COALESCE(EXCLUDED.captured_at, {t}.captured_at),
                updated_at = EXCLUDED.updated_at
            "#
        )
    }

    fn containment_predicate(&self) -> String {
        "tags @> $1::jsonb".to_string()
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
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fetch_by_path(&self, image_path: &str) -> Result<Option<StoredRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM {} WHERE image_path = $1",
            select_columns("tags::text"),
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
            select_columns("tags::text"),
            self.table,
            self.containment_predicate()
        );
        // `@>` on a one-element array matches exact array members only.
        let probe = serde_json::json!([tag]).to_string();
        let rows = sqlx::query(&sql).bind(probe).fetch_all(&self.pool).await?;
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
