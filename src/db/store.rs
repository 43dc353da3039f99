use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;

use super::backend::{StorageBackend, StorageEngine, StoredRow, UpsertRow};
use super::{MAX_IMAGE_PATH_CHARS, MAX_TAG_CHARS};
use crate::error::{TaggerError, TaggerResult};
use crate::models::tag::{StoreHealth, StoreStats, TagRecord};

/// EXIF `DateTimeOriginal` layout.
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Engine-agnostic tag persistence.
///
/// Exactly one record exists per `image_path`; an upsert replaces the prior
/// tag list. Cloning is cheap and shares the underlying pool.
#[derive(Clone)]
pub struct TagStore {
    backend: Arc<dyn StorageBackend>,
}

impl TagStore {
    /// Wrap a backend and run its create-if-absent schema. Existing tables
    /// are left untouched.
    pub async fn open(backend: Arc<dyn StorageBackend>) -> TaggerResult<Self> {
        backend.init_schema().await.map_err(|e| {
            tracing::error!(engine = %backend.engine(), error = %e, "Schema initialization failed");
            TaggerError::from(e)
        })?;

        tracing::info!(
            engine = %backend.engine(),
            table = %backend.table(),
            "Tag table created/verified"
        );
        Ok(Self { backend })
    }

    pub fn engine(&self) -> StorageEngine {
        self.backend.engine()
    }

    /// Insert or replace the tag list for `image_path`.
    pub async fn upsert(&self, image_path: &str, tags: &[String]) -> TaggerResult<()> {
        self.upsert_with_capture(image_path, tags, None).await
    }

    /// Like [`TagStore::upsert`], also recording an EXIF capture time.
    ///
    /// Paths longer than [`MAX_IMAGE_PATH_CHARS`] and tags longer than
    /// [`MAX_TAG_CHARS`] are rejected on every engine. An unparsable
    /// `captured_at` is logged and stored as NULL; it never fails the write.
    /// A NULL capture time keeps any previously stored one.
    pub async fn upsert_with_capture(
        &self,
        image_path: &str,
        tags: &[String],
        captured_at: Option<&str>,
    ) -> TaggerResult<()> {
        if image_path.is_empty() {
            return Err(TaggerError::Persistence(
                "image path must not be empty".to_string(),
            ));
        }
        if image_path.chars().count() > MAX_IMAGE_PATH_CHARS {
            return Err(TaggerError::Persistence(format!(
                "image path exceeds {MAX_IMAGE_PATH_CHARS} characters"
            )));
        }
        if let Some(tag) = tags.iter().find(|t| t.chars().count() > MAX_TAG_CHARS) {
            return Err(TaggerError::Persistence(format!(
                "tag exceeds {MAX_TAG_CHARS} characters: {}...",
                tag.chars().take(32).collect::<String>()
            )));
        }

        let tags_json = serde_json::to_string(tags)?;
        let captured_at = captured_at.and_then(|raw| {
            let parsed = parse_exif_datetime(raw);
            if parsed.is_none() {
                tracing::warn!(image_path = %image_path, raw = %raw, "Unparsable EXIF datetime");
            }
            parsed
        });

        let row = UpsertRow {
            image_path,
            tags_json: &tags_json,
            captured_at,
            now: Utc::now(),
        };

        self.backend.upsert(&row).await.map_err(|e| {
            tracing::error!(image_path = %image_path, error = %e, "Failed to save tags");
            TaggerError::from(e)
        })?;

        tracing::debug!(image_path = %image_path, tags = ?tags, "Saved tags");
        Ok(())
    }

    /// Stored record for `image_path`, or `None` when unknown.
    pub async fn get(&self, image_path: &str) -> TaggerResult<Option<TagRecord>> {
        let row = self.backend.fetch_by_path(image_path).await.map_err(|e| {
            tracing::error!(image_path = %image_path, error = %e, "Failed to read tags");
            TaggerError::from(e)
        })?;
        row.map(decode_row).transpose()
    }

    /// Records whose tag list contains `tag` exactly (case-sensitive),
    /// most recently updated first.
    pub async fn search_by_tag(&self, tag: &str) -> TaggerResult<Vec<TagRecord>> {
        let rows = self.backend.fetch_containing(tag).await.map_err(|e| {
            tracing::error!(tag = %tag, error = %e, "Tag search failed");
            TaggerError::from(e)
        })?;

        let mut records = rows
            .into_iter()
            .map(decode_row)
            .collect::<TaggerResult<Vec<_>>>()?;

        // Engines may over-match; keep exact members only.
        records.retain(|r| r.has_tag(tag));
        records.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.image_path.cmp(&b.image_path))
        });
        Ok(records)
    }

    pub async fn stats(&self) -> TaggerResult<StoreStats> {
        self.backend.fetch_stats().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to read store statistics");
            TaggerError::from(e)
        })
    }

    /// Liveness probe. Never fails; errors are reported in the result.
    pub async fn health(&self) -> StoreHealth {
        match self.backend.count_records().await {
            Ok(count) => StoreHealth {
                reachable: true,
                record_count: Some(count),
                engine: self.engine().to_string(),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Tag database unreachable");
                StoreHealth {
                    reachable: false,
                    record_count: None,
                    engine: self.engine().to_string(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Drain the connection pool.
    pub async fn close(&self) {
        self.backend.close().await;
        tracing::info!(engine = %self.engine(), "Tag database connection closed");
    }
}

fn decode_row(row: StoredRow) -> TaggerResult<TagRecord> {
    let tags: Vec<String> = serde_json::from_str(&row.tags_json)?;
    Ok(TagRecord {
        image_path: row.image_path,
        tags,
        captured_at: row.captured_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Parse an EXIF `YYYY:MM:DD HH:MM:SS` timestamp. EXIF ASCII values may be
/// NUL padded.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    NaiveDateTime::parse_from_str(trimmed, EXIF_DATETIME_FORMAT).ok()
}
