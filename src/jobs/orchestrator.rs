use crate::error::{ProcessingError, Result};
use crate::jobs::log::JobLog;
use crate::jobs::queue::JobQueue;
use crate::jobs::store::{apply_transition, JobStore};
use crate::jobs::transform::CsvTransform;
use crate::jobs::worker::{WorkerContext, WorkerPool};
use crate::models::{
    Job, JobKind, JobStatus, JobStatusResponse, SubmitRequest, SubmitResponse, WorkUnit,
};
use crate::storage::FileStore;
use crate::utils::filename::content_type_for;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use validator::Validate;

/// Derived output of a succeeded job
#[derive(Debug, Clone, PartialEq)]
pub struct JobResultFile {
    pub path: PathBuf,
    pub filename: String,
    pub content_type: &'static str,
}

pub struct JobOrchestrator {
    files: Arc<dyn FileStore>,
    store: Arc<dyn JobStore>,
    queue: Arc<JobQueue>,
    log: JobLog,
    transform: Arc<CsvTransform>,
}

impl JobOrchestrator {
    pub fn new(
        files: Arc<dyn FileStore>,
        store: Arc<dyn JobStore>,
        log: JobLog,
        transform: CsvTransform,
    ) -> Self {
        Self {
            files,
            store,
            queue: Arc::new(JobQueue::new()),
            log,
            transform: Arc::new(transform),
        }
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    /// Resolve the input, persist a `queued` record, then hand the unit to
    /// the queue. The record exists before the caller gets a response.
    pub fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse> {
        request.validate()?;

        let file = self
            .files
            .resolve_or_latest(request.dataset_id, request.file_id)?;

        let unit = WorkUnit {
            kind: JobKind::ProcessCsv,
            dataset_id: request.dataset_id,
            file_id: file.file_id,
            input_path: file.path,
            value_column: request.value_column.clone(),
        };

        let job_id = self.queue.next_id();
        self.store.insert(&Job::queued(job_id.clone(), &unit))?;
        if let Err(e) = self.queue.push(job_id.clone(), unit) {
            let reason = e.to_string();
            if let Err(mark_err) =
                apply_transition(self.store.as_ref(), &job_id, JobStatus::Failed, |job| {
                    job.error = Some(reason)
                })
            {
                warn!("Could not fail unqueued job {}: {}", job_id, mark_err);
            }
            return Err(e);
        }

        info!(
            "Queued job {} for dataset {} file {} (y={})",
            job_id, request.dataset_id, file.file_id, request.value_column
        );

        Ok(SubmitResponse {
            job_id,
            status: JobStatus::Queued,
            dataset_id: request.dataset_id,
            file_id: file.file_id,
            value_column: request.value_column.clone(),
        })
    }

    /// Durable record merged with live queue state; terminal durable state wins
    pub fn status(&self, job_id: &str) -> Result<JobStatusResponse> {
        let durable = self.store.get(job_id)?;
        let transient = self.queue.entry(job_id);

        match (durable, transient) {
            (Some(job), transient) => Ok(JobStatusResponse {
                status: JobStatus::reconcile(job.status, transient.map(|t| t.status)),
                job_id: job.job_id,
                dataset_id: job.dataset_id,
                input_path: job.input_path,
                result_path: job.result_path,
                result_summary: job.result_summary,
            }),
            (None, Some(entry)) => Ok(JobStatusResponse {
                job_id: job_id.to_string(),
                status: entry.status,
                dataset_id: entry.unit.dataset_id,
                input_path: entry.unit.input_path,
                result_path: None,
                result_summary: None,
            }),
            (None, None) => Err(ProcessingError::not_found("job", job_id)),
        }
    }

    /// Execution log text; empty until the first step is logged
    pub fn log_text(&self, job_id: &str) -> Result<String> {
        self.ensure_known(job_id)?;
        self.log.read(job_id)
    }

    pub fn result(&self, job_id: &str) -> Result<JobResultFile> {
        let status = self.status(job_id)?;
        let path = match (status.status, status.result_path) {
            (JobStatus::Succeeded, Some(path)) if path.is_file() => path,
            (state, _) => {
                return Err(ProcessingError::not_found(
                    "result for job",
                    format!("{} (status {})", job_id, state),
                ))
            }
        };

        Ok(JobResultFile {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            content_type: content_type_for(&path),
            path,
        })
    }

    /// Start workers on this orchestrator's queue
    pub fn start_workers(&self, worker_count: usize, timeout: Duration) -> WorkerPool {
        let ctx = WorkerContext {
            store: Arc::clone(&self.store),
            queue: Arc::clone(&self.queue),
            log: self.log.clone(),
            transform: Arc::clone(&self.transform),
            timeout,
        };
        WorkerPool::start(worker_count, Arc::new(ctx))
    }

    /// Poll until the job is terminal or `deadline` passes
    pub async fn wait_for(
        &self,
        job_id: &str,
        poll: Duration,
        deadline: Duration,
    ) -> Result<JobStatusResponse> {
        let started = tokio::time::Instant::now();
        loop {
            let status = self.status(job_id)?;
            if status.status.is_terminal() || started.elapsed() >= deadline {
                return Ok(status);
            }
            tokio::time::sleep(poll).await;
        }
    }

    fn ensure_known(&self, job_id: &str) -> Result<()> {
        if self.store.get(job_id)?.is_some() || self.queue.entry(job_id).is_some() {
            Ok(())
        } else {
            Err(ProcessingError::not_found("job", job_id))
        }
    }
}
