//! Shared helpers: temporary SQLite stores, generated images and a scripted
//! inference adapter.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, Rgb};
use photo_tagger::db::{self, PoolSettings, StorageEngine, TagStore};
use photo_tagger::models::job::RankedTag;
use photo_tagger::services::inference::{rank_top_k, InferenceAdapter, InferenceError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

pub const TEST_TABLE: &str = "ai_photo_tags";

/// Width that makes [`ScriptedInference`] fail the image.
pub const POISON_WIDTH: u32 = 13;

/// Fresh file-backed SQLite store. Keep the `TempDir` alive for the test.
pub async fn sqlite_store() -> (TagStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = sqlite_store_in(dir.path()).await;
    (store, dir)
}

pub async fn sqlite_store_in(dir: &Path) -> TagStore {
    db::open_store(
        StorageEngine::Sqlite,
        &sqlite_url(dir),
        TEST_TABLE,
        &PoolSettings::default(),
    )
    .await
    .expect("Failed to open SQLite tag store")
}

pub fn sqlite_url(dir: &Path) -> String {
    format!("sqlite://{}", dir.join("tags.db").display())
}

pub fn labels(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
}

/// Write a solid-colour PNG of the given size.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    ImageBuffer::from_pixel(width, height, Rgb([120u8, 180, 60]))
        .save(&path)
        .expect("Failed to write test image");
    path
}

/// Deterministic adapter: label `i` gets probability proportional to
/// `i + 1`, so the last vocabulary label always ranks first. Images whose
/// width is [`POISON_WIDTH`] fail. Tracks overlapping calls and the
/// start/end order of calls.
pub struct ScriptedInference {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
    events: Mutex<Vec<String>>,
}

impl ScriptedInference {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `"start"` / `"end"` markers in the order calls began and finished.
    pub fn events(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| if e.starts_with("start") { "start" } else { "end" })
            .collect()
    }
}

#[async_trait]
impl InferenceAdapter for ScriptedInference {
    async fn score(
        &self,
        image: &DynamicImage,
        labels: &[String],
        top_k: usize,
    ) -> Result<Vec<RankedTag>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.events.lock().unwrap().push("start".to_string());

        tokio::time::sleep(self.delay).await;

        self.events.lock().unwrap().push("end".to_string());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if image.width() == POISON_WIDTH {
            return Err(InferenceError::Malformed(
                "unsupported image content".to_string(),
            ));
        }

        let total: f32 = (1..=labels.len()).map(|i| i as f32).sum();
        let scores: Vec<f32> = (1..=labels.len()).map(|i| i as f32 / total).collect();
        Ok(rank_top_k(labels, &scores, top_k))
    }
}

/// Adapter that never answers.
pub struct StuckInference;

#[async_trait]
impl InferenceAdapter for StuckInference {
    async fn score(
        &self,
        _image: &DynamicImage,
        _labels: &[String],
        _top_k: usize,
    ) -> Result<Vec<RankedTag>, InferenceError> {
        std::future::pending().await
    }
}

/// Poll until the store holds `count` records, for up to five seconds.
pub async fn wait_for_records(store: &TagStore, count: i64) -> bool {
    for _ in 0..100 {
        if matches!(store.stats().await, Ok(s) if s.total_records == count) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
