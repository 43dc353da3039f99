use std::sync::Arc;
use std::time::Duration;

use crate::db::TagStore;
use crate::services::orchestrator::BatchOrchestrator;
use crate::services::translation::LabelTranslator;

/// Job parameters used when a request leaves them out.
#[derive(Debug, Clone)]
pub struct JobDefaults {
    pub top_k: usize,
    pub group_size: usize,
    pub pacing_delay: Duration,
}

/// Shared application state passed to all route handlers. Built once at
/// start-up; the store's pool is closed when the server stops.
#[derive(Clone)]
pub struct AppState {
    pub store: TagStore,
    pub orchestrator: Arc<BatchOrchestrator>,
    pub vocabulary: Arc<Vec<String>>,
    pub translator: Arc<LabelTranslator>,
    pub defaults: JobDefaults,
}

/// How many vocabulary labels are offered when neither the full vocabulary
/// nor custom tags are requested.
const DEFAULT_SUBSET: usize = 50;

impl AppState {
    pub fn new(
        store: TagStore,
        orchestrator: BatchOrchestrator,
        vocabulary: Vec<String>,
        translator: Arc<LabelTranslator>,
        defaults: JobDefaults,
    ) -> Self {
        Self {
            store,
            orchestrator: Arc::new(orchestrator),
            vocabulary: Arc::new(vocabulary),
            translator,
            defaults,
        }
    }

    /// Pick the candidate labels for a request: the full vocabulary unless
    /// `use_all_tags` is false, then custom tags, then a default subset.
    pub fn candidate_tags(
        &self,
        use_all_tags: Option<bool>,
        custom_tags: Option<&[String]>,
    ) -> Vec<String> {
        select_candidates(&self.vocabulary, use_all_tags, custom_tags)
    }
}

fn select_candidates(
    vocabulary: &[String],
    use_all_tags: Option<bool>,
    custom_tags: Option<&[String]>,
) -> Vec<String> {
    if use_all_tags.unwrap_or(true) {
        return vocabulary.to_vec();
    }
    match custom_tags {
        Some(tags) if !tags.is_empty() => tags.to_vec(),
        _ => vocabulary.iter().take(DEFAULT_SUBSET).cloned().collect(),
    }
}
