use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

use crate::db::TagStore;
use crate::error::{TaggerError, TaggerResult};
use crate::models::job::{BatchJob, JobSummary, PerImageOutcome, RankedTag};
use crate::services::aggregator::ResultAggregator;
use crate::services::exif::read_capture_time;
use crate::services::image_loader::{load_image, DEFAULT_MAX_SIDE};
use crate::services::inference::InferenceAdapter;
use crate::services::translation::LabelTranslator;

/// Per-image knobs that are not part of a job.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_image_side: u32,
    /// Upper bound on loading + scoring one image. `None` waits forever.
    pub task_timeout: Option<Duration>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_image_side: DEFAULT_MAX_SIDE,
            task_timeout: None,
        }
    }
}

/// Drives tagging jobs: bounded-width groups, per-image isolation, paced
/// group boundaries, best-effort persistence.
pub struct BatchOrchestrator {
    inference: Arc<dyn InferenceAdapter>,
    store: TagStore,
    translator: Arc<LabelTranslator>,
    settings: OrchestratorSettings,
}

/// Everything an image task needs, shared across one group.
struct TaskContext {
    inference: Arc<dyn InferenceAdapter>,
    translator: Arc<LabelTranslator>,
    candidate_tags: Vec<String>,
    top_k: usize,
    max_image_side: u32,
    task_timeout: Option<Duration>,
}

impl BatchOrchestrator {
    pub fn new(
        inference: Arc<dyn InferenceAdapter>,
        store: TagStore,
        translator: Arc<LabelTranslator>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            inference,
            store,
            translator,
            settings,
        }
    }

    pub fn store(&self) -> &TagStore {
        &self.store
    }

    fn task_context(&self, job: &BatchJob) -> Arc<TaskContext> {
        Arc::new(TaskContext {
            inference: Arc::clone(&self.inference),
            translator: Arc::clone(&self.translator),
            candidate_tags: job.candidate_tags().to_vec(),
            top_k: job.top_k(),
            max_image_side: self.settings.max_image_side,
            task_timeout: self.settings.task_timeout,
        })
    }

    /// Tag a single image and persist it when successful.
    ///
    /// Image-level failures are returned inside the outcome; only invalid
    /// parameters produce an error. A failed save is logged, not returned.
    pub async fn tag_one(
        &self,
        image_path: &str,
        candidate_tags: Vec<String>,
        top_k: usize,
    ) -> TaggerResult<PerImageOutcome> {
        let job = BatchJob::new(
            vec![image_path.to_string()],
            candidate_tags,
            top_k,
            1,
            Duration::ZERO,
        )?;

        let ctx = self.task_context(&job);
        let outcome = tag_image(ctx, image_path.to_string()).await;

        if outcome.is_persistable() {
            if let Err(e) = self.save_outcome(&outcome).await {
                tracing::error!(
                    image_path = %image_path,
                    error = %e,
                    "Save failed for single image"
                );
            }
        }
        Ok(outcome)
    }

    /// Run a job to completion on a background task.
    pub fn submit(self: &Arc<Self>, job: BatchJob) -> JoinHandle<JobSummary> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.run(job).await })
    }

    /// Run a job in the background with nobody awaiting it. A job that
    /// panics is logged with its id. Returns the job id.
    pub fn start_detached(self: &Arc<Self>, job: BatchJob) -> Uuid {
        let job_id = job.id();
        let handle = self.submit(job);
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                tracing::error!(job_id = %job_id, error = %e, "Tagging job aborted");
            }
        });
        job_id
    }

    /// Execute `job` group by group.
    ///
    /// Each group is a barrier: every image task resolves, then the
    /// successful outcomes are saved, then the pacing delay elapses before
    /// the next group starts. No delay follows the last group.
    pub async fn run(&self, job: BatchJob) -> JobSummary {
        let mut aggregator = ResultAggregator::new(job.id());
        let total = job.images().len();

        if total == 0 {
            tracing::info!(job_id = %job.id(), "Empty job, nothing to tag");
            return aggregator.finish();
        }

        let group_count = job.group_count();
        tracing::info!(
            job_id = %job.id(),
            images = total,
            groups = group_count,
            group_size = job.group_size(),
            top_k = job.top_k(),
            vocabulary = job.candidate_tags().len(),
            "Starting tagging job"
        );
        metrics::counter!("tagging_jobs_total").increment(1);
        metrics::gauge!("tagging_jobs_active").increment(1.0);

        let ctx = self.task_context(&job);

        for (index, group) in job.images().chunks(job.group_size()).enumerate() {
            let group_start = Instant::now();

            let outcomes = run_group(&ctx, group).await;
            aggregator.record_group(&outcomes);
            self.save_group(&outcomes, &mut aggregator).await;

            metrics::histogram!("tagging_group_seconds")
                .record(group_start.elapsed().as_secs_f64());
            tracing::info!(
                job_id = %job.id(),
                group = index + 1,
                processed = aggregator.attempted(),
                total = total,
                "Group complete"
            );

            if index + 1 < group_count && !job.pacing_delay().is_zero() {
                sleep(job.pacing_delay()).await;
            }
        }

        metrics::gauge!("tagging_jobs_active").decrement(1.0);
        let summary = aggregator.finish();
        tracing::info!(
            job_id = %summary.job_id,
            attempted = summary.attempted,
            tagged = summary.tagged,
            failed = summary.failed,
            saved = summary.saved,
            elapsed_ms = summary.elapsed_ms,
            "Tagging job finished"
        );
        summary
    }

    /// Save every persistable outcome independently. One failed write
    /// does not affect its siblings.
    async fn save_group(&self, outcomes: &[PerImageOutcome], aggregator: &mut ResultAggregator) {
        let saves = outcomes
            .iter()
            .filter(|o| o.is_persistable())
            .map(|o| async move { (o, self.save_outcome(o).await) });

        for (outcome, result) in join_all(saves).await {
            match result {
                Ok(()) => aggregator.record_save(true),
                Err(e) => {
                    tracing::error!(
                        image_path = %outcome.image_path,
                        error = %e,
                        "Failed to persist tags, continuing"
                    );
                    aggregator.record_save(false);
                }
            }
        }
    }

    async fn save_outcome(&self, outcome: &PerImageOutcome) -> TaggerResult<()> {
        self.store
            .upsert_with_capture(
                &outcome.image_path,
                &outcome.labels(),
                outcome.captured_at.as_deref(),
            )
            .await
    }
}

/// Launch one task per image and wait for all of them.
async fn run_group(ctx: &Arc<TaskContext>, group: &[String]) -> Vec<PerImageOutcome> {
    let handles: Vec<_> = group
        .iter()
        .map(|path| tokio::spawn(tag_image(Arc::clone(ctx), path.clone())))
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .zip(group)
        .map(|(joined, path)| {
            joined.unwrap_or_else(|e| {
                tracing::error!(image_path = %path, error = %e, "Tagging task aborted");
                PerImageOutcome::failed(path.clone(), format!("tagging task aborted: {e}"))
            })
        })
        .collect()
}

/// Load, score and translate one image. Never fails: errors become a
/// failed outcome.
async fn tag_image(ctx: Arc<TaskContext>, image_path: String) -> PerImageOutcome {
    let work = score_image(&ctx, &image_path);
    let result = match ctx.task_timeout {
        Some(limit) => tokio::time::timeout(limit, work).await.unwrap_or_else(|_| {
            Err(TaggerError::Inference(format!(
                "timed out after {}ms",
                limit.as_millis()
            )))
        }),
        None => work.await,
    };

    match result {
        Ok((ranked, captured_at)) => {
            tracing::info!(image_path = %image_path, tags = ranked.len(), "Image tagged");
            PerImageOutcome::success(image_path, ranked).with_capture_time(captured_at)
        }
        Err(e) => {
            tracing::warn!(image_path = %image_path, error = %e, "Image tagging failed");
            PerImageOutcome::failed(image_path, e.to_string())
        }
    }
}

async fn score_image(
    ctx: &TaskContext,
    image_path: &str,
) -> TaggerResult<(Vec<RankedTag>, Option<String>)> {
    let path = PathBuf::from(image_path);
    let max_side = ctx.max_image_side;

    // Decoding is CPU-bound; keep it off the scheduler threads.
    let (image, captured_at) = tokio::task::spawn_blocking(move || {
        let image = load_image(&path, max_side)?;
        Ok::<_, TaggerError>((image, read_capture_time(&path)))
    })
    .await
    .map_err(|e| TaggerError::Inference(format!("image loader aborted: {e}")))??;

    let ranked = ctx
        .inference
        .score(&image, &ctx.candidate_tags, ctx.top_k)
        .await?;

    Ok((ctx.translator.translate_ranked(ranked), captured_at))
}
