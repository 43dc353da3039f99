use async_trait::async_trait;
use base64::Engine;
use image::DynamicImage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;

use crate::error::TaggerError;
use crate::models::job::RankedTag;

/// Scores one decoded image against a candidate label set.
///
/// Returns at most `min(top_k, labels.len())` labels sorted by descending
/// confidence. Confidences are probabilities over `labels`.
#[async_trait]
pub trait InferenceAdapter: Send + Sync {
    async fn score(
        &self,
        image: &DynamicImage,
        labels: &[String],
        top_k: usize,
    ) -> Result<Vec<RankedTag>, InferenceError>;
}

/// Client for an HTTP zero-shot image classification service.
pub struct ClipHttpClient {
    http: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    image: String,
    labels: &'a [String],
}

#[derive(Deserialize)]
struct ScoreResponse {
    probabilities: Vec<f32>,
}

impl ClipHttpClient {
    pub fn new(endpoint: &str, request_timeout: Option<Duration>) -> Result<Self, InferenceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(InferenceError::Http)?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl InferenceAdapter for ClipHttpClient {
    async fn score(
        &self,
        image: &DynamicImage,
        labels: &[String],
        top_k: usize,
    ) -> Result<Vec<RankedTag>, InferenceError> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }

        // Full-frame JPEG encoding is CPU-bound; keep it off the scheduler threads.
        let owned = image.clone();
        let payload = tokio::task::spawn_blocking(move || encode_payload(&owned))
            .await
            .map_err(|e| InferenceError::Encode(format!("encoder aborted: {e}")))??;

        let request_body = ScoreRequest {
            image: payload,
            labels,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request_body)
            .send()
            .await
            .map_err(InferenceError::Http)?
            .error_for_status()
            .map_err(InferenceError::Http)?;

        let scores: ScoreResponse = response.json().await.map_err(InferenceError::Http)?;

        if scores.probabilities.len() != labels.len() {
            return Err(InferenceError::Malformed(format!(
                "expected {} probabilities, got {}",
                labels.len(),
                scores.probabilities.len()
            )));
        }

        Ok(rank_top_k(labels, &scores.probabilities, top_k))
    }
}

/// JPEG-encode `image` and wrap it as base64 for the request body.
/// Blocking; call from the blocking pool.
pub fn encode_payload(image: &DynamicImage) -> Result<String, InferenceError> {
    let mut jpeg = Vec::new();
    image
        .to_rgb8()
        .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
        .map_err(|e| InferenceError::Encode(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(&jpeg))
}

/// Pair labels with scores, sort descending and keep `min(top_k, len)`.
///
/// Ties keep vocabulary order. NaN scores sort last.
pub fn rank_top_k(labels: &[String], scores: &[f32], top_k: usize) -> Vec<RankedTag> {
    let mut ranked: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .take(labels.len())
        .collect();
    ranked.sort_by(|a, b| {
        let (x, y) = (nan_low(a.1), nan_low(b.1));
        y.total_cmp(&x).then(a.0.cmp(&b.0))
    });

    ranked
        .into_iter()
        .take(top_k.min(labels.len()))
        .map(|(idx, confidence)| RankedTag {
            label: labels[idx].clone(),
            confidence,
        })
        .collect()
}

fn nan_low(v: f32) -> f32 {
    if v.is_nan() {
        f32::NEG_INFINITY
    } else {
        v
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to encode image for scoring: {0}")]
    Encode(String),

    #[error("malformed scoring response: {0}")]
    Malformed(String),
}

impl From<InferenceError> for TaggerError {
    fn from(e: InferenceError) -> Self {
        TaggerError::Inference(e.to_string())
    }
}
