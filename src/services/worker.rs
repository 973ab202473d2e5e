//! In-process enrichment worker.
//!
//! Jobs are queued in memory and drained strictly FIFO by at most one task
//! per worker. The queue is not durable: jobs still queued when the process
//! exits are lost, and an image interrupted mid-analysis keeps its
//! `processing` status until someone submits it again.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::sleep;

use crate::models::image::{AnalysisResult, ImageId, ProcessingStatus};
use crate::models::job::EnrichmentJob;
use crate::services::analysis::{AnalysisError, ImageAnalyzer};
use crate::store::{MetadataStore, StoreError};

/// Tuning knobs. The defaults make one attempt per job with no timeout.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause after every job, a crude stand-in for upstream rate limiting.
    pub inter_job_delay: Duration,
    pub max_attempts: u32,
    pub per_call_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            inter_job_delay: Duration::from_secs(1),
            max_attempts: 1,
            per_call_timeout: None,
        }
    }
}

/// Snapshot of the queue for health reporting.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    /// Queued jobs plus the one currently being analyzed.
    pub pending: usize,
    pub is_processing: bool,
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<EnrichmentJob>,
    active: bool,
    in_flight: Option<ImageId>,
}

struct Inner {
    state: Mutex<QueueState>,
    store: Arc<dyn MetadataStore>,
    analyzer: Arc<dyn ImageAnalyzer>,
    config: WorkerConfig,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the enrichment queue. Cheap to clone; all clones share one queue.
#[derive(Clone)]
pub struct EnrichmentWorker {
    inner: Arc<Inner>,
}

#[derive(Debug, thiserror::Error)]
enum JobError {
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("metadata store failed: {0}")]
    Store(#[from] StoreError),
}

impl EnrichmentWorker {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        analyzer: Arc<dyn ImageAnalyzer>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                store,
                analyzer,
                config,
            }),
        }
    }

    /// Append a job to the tail of the queue and return immediately.
    ///
    /// Starts the drain loop if it is not already running. Completion is only
    /// observable through [`status`](Self::status) or the image's stored
    /// status. Must be called from within a Tokio runtime.
    pub fn submit(&self, job: EnrichmentJob) {
        let image_id = job.image_id;
        let (start_drain, depth) = {
            let mut state = self.inner.lock();
            state.jobs.push_back(job);
            let start = !state.active;
            state.active = true;
            (start, state.jobs.len())
        };

        metrics::counter!("enrichment_jobs_submitted_total").increment(1);
        metrics::gauge!("enrichment_queue_depth").set(depth as f64);
        tracing::debug!(image_id, queue_depth = depth, "Enrichment job queued");

        if start_drain {
            tokio::spawn(drain(Arc::clone(&self.inner)));
        }
    }

    pub fn status(&self) -> WorkerStatus {
        let state = self.inner.lock();
        WorkerStatus {
            pending: state.jobs.len() + usize::from(state.in_flight.is_some()),
            is_processing: state.active,
        }
    }
}

async fn drain(inner: Arc<Inner>) {
    tracing::info!("Enrichment drain loop started");

    loop {
        let job = {
            let mut state = inner.lock();
            match state.jobs.pop_front() {
                Some(job) => {
                    state.in_flight = Some(job.image_id);
                    metrics::gauge!("enrichment_queue_depth").set(state.jobs.len() as f64);
                    job
                }
                None => {
                    state.active = false;
                    break;
                }
            }
        };

        let image_id = job.image_id;

        // A panicking collaborator must not take the loop down with it.
        let outcome = tokio::spawn(process_job(Arc::clone(&inner), job)).await;
        if let Err(e) = outcome {
            tracing::error!(image_id, error = %e, "Enrichment job aborted");
            metrics::counter!("enrichment_jobs_failed_total").increment(1);
            mark_failed(&inner, image_id).await;
        }

        inner.lock().in_flight = None;
        sleep(inner.config.inter_job_delay).await;
    }

    tracing::info!("Enrichment queue drained");
}

async fn process_job(inner: Arc<Inner>, job: EnrichmentJob) {
    let image_id = job.image_id;
    tracing::info!(
        image_id,
        mime_type = %job.mime_type,
        bytes = job.image_bytes.len(),
        model = inner.analyzer.model_name(),
        "Processing enrichment job"
    );

    match enrich(&inner, &job).await {
        Ok(()) => {
            metrics::counter!("enrichment_jobs_completed_total").increment(1);
            tracing::info!(image_id, "Enrichment completed");
        }
        Err(e) => {
            metrics::counter!("enrichment_jobs_failed_total").increment(1);
            tracing::error!(image_id, error = %e, "Enrichment failed");
            mark_failed(&inner, image_id).await;
        }
    }
}

async fn enrich(inner: &Inner, job: &EnrichmentJob) -> Result<(), JobError> {
    inner
        .store
        .set_status(job.image_id, ProcessingStatus::Processing)
        .await?;

    let result = analyze_with_attempts(inner, job).await?;

    tracing::debug!(
        image_id = job.image_id,
        tags = result.tags.len(),
        colors = result.colors.len(),
        "Analysis parsed"
    );

    inner.store.set_result(job.image_id, &result).await?;
    Ok(())
}

async fn analyze_with_attempts(
    inner: &Inner,
    job: &EnrichmentJob,
) -> Result<AnalysisResult, AnalysisError> {
    let max_attempts = inner.config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let start = Instant::now();
        let call = inner.analyzer.analyze(&job.image_bytes, &job.mime_type);
        let outcome = match inner.config.per_call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(AnalysisError::Timeout(limit))),
            None => call.await,
        };
        metrics::histogram!("enrichment_analysis_seconds").record(start.elapsed().as_secs_f64());

        match outcome {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    image_id = job.image_id,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Analysis attempt failed, retrying"
                );
                attempt += 1;
                sleep(inner.config.inter_job_delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn mark_failed(inner: &Inner, image_id: ImageId) {
    if let Err(e) = inner
        .store
        .set_status(image_id, ProcessingStatus::Failed)
        .await
    {
        tracing::error!(image_id, error = %e, "Could not record failed status");
    }
}
