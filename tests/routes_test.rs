//! HTTP surface served on an ephemeral port over an SQLite store and the
//! scripted inference adapter.

mod helpers;

use helpers::*;
use photo_tagger::app_state::{AppState, JobDefaults};
use photo_tagger::db::TagStore;
use photo_tagger::routes::api_router;
use photo_tagger::services::orchestrator::{BatchOrchestrator, OrchestratorSettings};
use photo_tagger::services::translation::LabelTranslator;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct TestServer {
    base: String,
    client: reqwest::Client,
    store: TagStore,
    _db_dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let (store, db_dir) = sqlite_store().await;
        let translator = Arc::new(LabelTranslator::identity());
        let orchestrator = BatchOrchestrator::new(
            Arc::new(ScriptedInference::new(Duration::ZERO)),
            store.clone(),
            Arc::clone(&translator),
            OrchestratorSettings::default(),
        );
        let state = AppState::new(
            store.clone(),
            orchestrator,
            labels(&["cat", "dog", "car", "tree", "sea"]),
            translator,
            JobDefaults {
                top_k: 3,
                group_size: 2,
                pacing_delay: Duration::ZERO,
            },
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = api_router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            store,
            _db_dir: db_dir,
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_tag_image_returns_ranked_tags_and_persists() {
    let server = TestServer::start().await;
    let images = tempfile::tempdir().unwrap();
    let path = write_png(images.path(), "beach.png", 30, 20).display().to_string();

    let (status, body) = server
        .post("/tag/image", json!({ "image_path": path, "top_k": 2 }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].is_null());
    let labels: Vec<_> = body["ranked_tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["label"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(labels, vec!["sea", "tree"]);

    let response = server
        .client
        .get(format!("{}/image/tags", server.base))
        .query(&[("path", path.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["found"], json!(true));
    assert_eq!(body["record"]["tags"], json!(["sea", "tree"]));
}

#[tokio::test]
async fn test_tag_missing_image_is_failed_outcome() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/tag/image", json!({ "image_path": "/no/such/photo.png" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].as_str().unwrap().contains("not found"));
    assert_eq!(body["ranked_tags"], json!([]));

    let (_, lookup) = server.get("/image/tags?path=/no/such/photo.png").await;
    assert_eq!(lookup["found"], json!(false));
}

#[tokio::test]
async fn test_invalid_requests_are_bad_request() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/tag/image", json!({ "image_path": "/a.png", "top_k": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = server
        .post("/tag/image", json!({ "image_path": "/a.png", "top_k": 101 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.post("/tag/image", json!({ "image_path": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let too_long = format!("/{}", "p".repeat(photo_tagger::db::MAX_IMAGE_PATH_CHARS));
    let (status, _) = server
        .post("/tag/image", json!({ "image_path": too_long }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let images = tempfile::tempdir().unwrap();
    write_png(images.path(), "a.png", 8, 8);
    let dir = images.path().display().to_string();
    for body in [
        json!({ "directory_path": dir, "group_size": 0 }),
        json!({ "directory_path": dir, "group_size": 65 }),
        json!({ "directory_path": dir, "top_k": 0 }),
    ] {
        let (status, _) = server.post("/tag/directory", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_custom_tags_empty_after_trim_is_bad_request() {
    let server = TestServer::start().await;
    let images = tempfile::tempdir().unwrap();
    let path = write_png(images.path(), "x.png", 8, 8).display().to_string();

    let (status, body) = server
        .post(
            "/tag/image",
            json!({ "image_path": path, "use_all_tags": false, "custom_tags": ["  "] }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("vocabulary"));
}

#[tokio::test]
async fn test_directory_without_images_is_not_found() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/tag/directory", json!({ "directory_path": "/no/such/dir" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let empty = tempfile::tempdir().unwrap();
    std::fs::write(empty.path().join("notes.txt"), b"not a photo").unwrap();
    let (status, body) = server
        .post(
            "/tag/directory",
            json!({ "directory_path": empty.path().display().to_string() }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("no images found"));
}

#[tokio::test]
async fn test_directory_job_acknowledged_then_searchable() {
    let server = TestServer::start().await;
    let images = tempfile::tempdir().unwrap();
    write_png(images.path(), "one.png", 16, 16);
    write_png(images.path(), "two.png", 16, 16);
    write_png(images.path(), "three.png", 16, 16);

    let (status, ack) = server
        .post(
            "/tag/directory",
            json!({ "directory_path": images.path().display().to_string(), "top_k": 2 }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["files_count"], json!(3));
    assert_eq!(ack["tags_count"], json!(5));
    assert_eq!(ack["top_k"], json!(2));
    assert!(ack["job_id"].is_string());

    assert!(wait_for_records(&server.store, 3).await);

    let (status, body) = server.get("/search/sea").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], json!(3));
    let (_, body) = server.get("/search/cat").await;
    assert_eq!(body["found"], json!(0));

    let (status, stats) = server.get("/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_records"], json!(3));
    assert_eq!(stats["engine"], json!("sqlite"));
}

#[tokio::test]
async fn test_available_tags() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/tags/available").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_tags"], json!(5));
    assert_eq!(body["vocabulary"], body["display_tags"]);
}

#[tokio::test]
async fn test_unreachable_database_degrades_health_and_fails_reads() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));

    server.store.close().await;

    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], json!("degraded"));
    assert_eq!(body["database"]["reachable"], json!(false));

    let (status, body) = server.get("/search/cat").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("persistence"));

    let (status, _) = server.get("/stats").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
