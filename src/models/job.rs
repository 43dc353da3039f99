use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{TaggerError, TaggerResult};

/// A directory-sized tagging job. Consumed once by the orchestrator.
#[derive(Debug, Clone)]
pub struct BatchJob {
    id: Uuid,
    images: Vec<String>,
    candidate_tags: Vec<String>,
    top_k: usize,
    group_size: usize,
    pacing_delay: Duration,
}

impl BatchJob {
    /// Validate caller input. Fails before any group executes.
    ///
    /// `candidate_tags` is treated as a set: repeated labels are dropped,
    /// keeping first-seen order. `images` is kept as given, duplicates included.
    pub fn new(
        images: Vec<String>,
        candidate_tags: Vec<String>,
        top_k: usize,
        group_size: usize,
        pacing_delay: Duration,
    ) -> TaggerResult<Self> {
        let candidate_tags = dedup_labels(candidate_tags);
        if candidate_tags.is_empty() {
            return Err(TaggerError::Configuration(
                "candidate tag vocabulary must not be empty".to_string(),
            ));
        }
        if top_k == 0 {
            return Err(TaggerError::Configuration("top_k must be at least 1".to_string()));
        }
        if group_size == 0 {
            return Err(TaggerError::Configuration(
                "group_size must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            images,
            candidate_tags,
            top_k,
            group_size,
            pacing_delay,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn candidate_tags(&self) -> &[String] {
        &self.candidate_tags
    }

    /// `top_k` clamped to the vocabulary size.
    pub fn top_k(&self) -> usize {
        self.top_k.min(self.candidate_tags.len())
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    pub fn pacing_delay(&self) -> Duration {
        self.pacing_delay
    }

    /// Number of groups the job will execute.
    pub fn group_count(&self) -> usize {
        self.images.len().div_ceil(self.group_size)
    }
}

fn dedup_labels(labels: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    labels
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty() && seen.insert(l.clone()))
        .collect()
}

/// One label with its probability over the candidate set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedTag {
    pub label: String,
    pub confidence: f32,
}

/// Result of tagging a single image.
///
/// A failed outcome carries no tags and is never written to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerImageOutcome {
    pub image_path: String,
    pub ranked_tags: Vec<RankedTag>,
    #[serde(rename = "error")]
    pub failure: Option<String>,
    /// Raw EXIF capture time read alongside the image, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub captured_at: Option<String>,
}

impl PerImageOutcome {
    pub fn success(image_path: impl Into<String>, ranked_tags: Vec<RankedTag>) -> Self {
        Self {
            image_path: image_path.into(),
            ranked_tags,
            failure: None,
            captured_at: None,
        }
    }

    pub fn with_capture_time(mut self, captured_at: Option<String>) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn failed(image_path: impl Into<String>, failure: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            ranked_tags: Vec::new(),
            failure: Some(failure.into()),
            captured_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Whether the outcome should reach the store.
    pub fn is_persistable(&self) -> bool {
        self.is_success() && !self.ranked_tags.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.ranked_tags.iter().map(|t| t.label.clone()).collect()
    }
}

/// Job-level counts, folded group by group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub attempted: usize,
    pub tagged: usize,
    pub failed: usize,
    pub saved: usize,
    pub save_failures: usize,
    pub groups: usize,
    /// `(image_path, reason)` in group-completion order.
    pub failures: Vec<(String, String)>,
    pub elapsed_ms: u64,
}

impl JobSummary {
    pub fn empty(job_id: Uuid) -> Self {
        Self {
            job_id,
            attempted: 0,
            tagged: 0,
            failed: 0,
            saved: 0,
            save_failures: 0,
            groups: 0,
            failures: Vec::new(),
            elapsed_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        let err = BatchJob::new(vec![], vec![], 5, 5, Duration::ZERO).unwrap_err();
        assert!(matches!(err, TaggerError::Configuration(_)));
    }

    #[test]
    fn test_blank_labels_count_as_empty_vocabulary() {
        let err = BatchJob::new(vec![], labels(&["", "  "]), 5, 5, Duration::ZERO).unwrap_err();
        assert!(matches!(err, TaggerError::Configuration(_)));
    }

    #[test]
    fn test_zero_group_size_rejected() {
        let err = BatchJob::new(vec![], labels(&["cat"]), 5, 0, Duration::ZERO).unwrap_err();
        assert!(matches!(err, TaggerError::Configuration(_)));
    }

    #[test]
    fn test_top_k_clamped_to_vocabulary() {
        let job = BatchJob::new(
            vec![],
            labels(&["cat", "dog", "car", "tree", "sea"]),
            100,
            5,
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(job.top_k(), 5);
    }

    #[test]
    fn test_vocabulary_deduplicated_in_order() {
        let job = BatchJob::new(vec![], labels(&["cat", "dog", "cat"]), 2, 1, Duration::ZERO)
            .unwrap();
        assert_eq!(job.candidate_tags(), &labels(&["cat", "dog"])[..]);
    }

    #[test]
    fn test_group_count() {
        let images: Vec<String> = (0..12).map(|i| format!("/img/{i}.jpg")).collect();
        let job = BatchJob::new(images, labels(&["cat"]), 1, 5, Duration::ZERO).unwrap();
        assert_eq!(job.group_count(), 3);
    }

    #[test]
    fn test_failed_outcome_not_persistable() {
        let outcome = PerImageOutcome::failed("/a.jpg", "file not found");
        assert!(!outcome.is_success());
        assert!(!outcome.is_persistable());
        assert!(outcome.ranked_tags.is_empty());
    }
}
