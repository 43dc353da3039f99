use std::time::Instant;
use uuid::Uuid;

use crate::models::job::{JobSummary, PerImageOutcome};

/// Folds group outcomes and save results into a [`JobSummary`].
pub struct ResultAggregator {
    summary: JobSummary,
    started: Instant,
}

impl ResultAggregator {
    pub fn new(job_id: Uuid) -> Self {
        Self {
            summary: JobSummary::empty(job_id),
            started: Instant::now(),
        }
    }

    /// Count one completed group.
    pub fn record_group(&mut self, outcomes: &[PerImageOutcome]) {
        self.summary.groups += 1;
        for outcome in outcomes {
            self.summary.attempted += 1;
            match &outcome.failure {
                None => self.summary.tagged += 1,
                Some(reason) => {
                    self.summary.failed += 1;
                    self.summary
                        .failures
                        .push((outcome.image_path.clone(), reason.clone()));
                }
            }
        }

        metrics::counter!("tagging_images_total").increment(outcomes.len() as u64);
        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        if failed > 0 {
            metrics::counter!("tagging_images_failed").increment(failed as u64);
        }
    }

    pub fn record_save(&mut self, saved: bool) {
        if saved {
            self.summary.saved += 1;
        } else {
            self.summary.save_failures += 1;
            metrics::counter!("tagging_saves_failed").increment(1);
        }
    }

    pub fn attempted(&self) -> usize {
        self.summary.attempted
    }

    pub fn finish(mut self) -> JobSummary {
        self.summary.elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.summary
    }
}
