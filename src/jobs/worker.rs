use crate::error::ProcessingError;
use crate::jobs::log::{JobContext, JobLog};
use crate::jobs::queue::{JobQueue, QueuedJob};
use crate::jobs::store::{apply_transition, JobStore};
use crate::jobs::transform::{CsvTransform, JobOutput};
use crate::models::{JobKind, JobStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Everything a worker needs to run and record a job
pub struct WorkerContext {
    pub store: Arc<dyn JobStore>,
    pub queue: Arc<JobQueue>,
    pub log: JobLog,
    pub transform: Arc<CsvTransform>,
    pub timeout: Duration,
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers pulling from the context's queue
    pub fn start(worker_count: usize, ctx: Arc<WorkerContext>) -> Self {
        let worker_count = worker_count.max(1);
        let handles = (0..worker_count)
            .map(|worker_id| {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    while let Some(job) = ctx.queue.pop().await {
                        run_job(&ctx, worker_id, job).await;
                    }
                    info!("Worker {} stopped", worker_id);
                })
            })
            .collect();

        info!("Started {} job workers", worker_count);
        Self { handles }
    }

    /// Wait for every worker to exit; the queue must have been closed first
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker task ended abnormally: {}", e);
            }
        }
    }
}

/// Run one job to a terminal state. Failures are recorded, never retried.
pub async fn run_job(ctx: &WorkerContext, worker_id: usize, job: QueuedJob) {
    let QueuedJob { job_id, unit } = job;
    info!("Worker {} picked up job {}", worker_id, job_id);

    mark(ctx, &job_id, JobStatus::Started, |_| {});

    let job_ctx = JobContext::new(job_id.clone(), ctx.log.clone());
    let outcome = match unit.kind {
        JobKind::ProcessCsv => {
            let transform = Arc::clone(&ctx.transform);
            let task_ctx = job_ctx.clone();
            let task = tokio::task::spawn_blocking(move || transform.run(&task_ctx, &unit));

            match tokio::time::timeout(ctx.timeout, task).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) => Err(ProcessingError::TaskJoin(join_error)),
                Err(_) => Err(ProcessingError::ComputeFailure(format!(
                    "timed out after {:?}",
                    ctx.timeout
                ))),
            }
        }
    };

    match outcome {
        Ok(JobOutput { result_path, stats }) => {
            mark(ctx, &job_id, JobStatus::Succeeded, |record| {
                record.result_path = Some(result_path);
                record.result_summary = Some(stats);
                record.error = None;
            });
            job_ctx.log("Done");
            info!("Job {} succeeded", job_id);
        }
        Err(e) => {
            job_ctx.log(&format!("ERROR: {}", e));
            mark(ctx, &job_id, JobStatus::Failed, |record| {
                record.result_path = None;
                record.result_summary = None;
                record.error = Some(e.to_string());
            });
            error!("Job {} failed: {}", job_id, e);
        }
    }
}

/// Durable record first, then the transient queue state. A terminal state
/// only leaves the queue once the durable record holds it.
fn mark(
    ctx: &WorkerContext,
    job_id: &str,
    status: JobStatus,
    update: impl FnOnce(&mut crate::models::Job),
) {
    match apply_transition(ctx.store.as_ref(), job_id, status, update) {
        Ok(_) if status.is_terminal() => {
            ctx.queue.remove(job_id);
        }
        Ok(true) => ctx.queue.set_status(job_id, status),
        Ok(false) => {}
        Err(e) => {
            error!("Could not persist {} for job {}: {}", status, job_id, e);
            if !status.is_terminal() {
                ctx.queue.set_status(job_id, status);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::{Job, WorkUnit};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory records; optionally refuses to persist terminal states
    #[derive(Default)]
    struct MemoryStore {
        jobs: Mutex<HashMap<String, Job>>,
        reject_terminal: bool,
    }

    impl JobStore for MemoryStore {
        fn insert(&self, job: &Job) -> Result<()> {
            self.jobs
                .lock()
                .unwrap()
                .insert(job.job_id.clone(), job.clone());
            Ok(())
        }

        fn get(&self, job_id: &str) -> Result<Option<Job>> {
            Ok(self.jobs.lock().unwrap().get(job_id).cloned())
        }

        fn save(&self, job: &Job) -> Result<()> {
            if self.reject_terminal && job.status.is_terminal() {
                return Err(ProcessingError::Io(std::io::Error::other("disk full")));
            }
            self.insert(job)
        }
    }

    fn context(dir: &TempDir, store: Arc<MemoryStore>) -> WorkerContext {
        WorkerContext {
            store,
            queue: Arc::new(JobQueue::new()),
            log: JobLog::new(dir.path().join("logs")),
            transform: Arc::new(CsvTransform::new(dir.path().join("processed"), 1024 * 1024)),
            timeout: Duration::from_secs(30),
        }
    }

    fn enqueue(ctx: &WorkerContext, input_path: std::path::PathBuf) -> String {
        let unit = WorkUnit {
            kind: JobKind::ProcessCsv,
            dataset_id: 1,
            file_id: 1,
            input_path,
            value_column: "value".to_string(),
        };
        let job_id = ctx.queue.next_id();
        ctx.store.insert(&Job::queued(job_id.clone(), &unit)).unwrap();
        ctx.queue.push(job_id.clone(), unit).unwrap();
        job_id
    }

    #[tokio::test]
    async fn test_terminal_job_leaves_the_queue() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("obs.csv");
        std::fs::write(&input, "time,value\n2024-01-01,1\n2024-01-02,3\n").unwrap();

        let store = Arc::new(MemoryStore::default());
        let ctx = context(&dir, store.clone());
        let job_id = enqueue(&ctx, input);

        let job = ctx.queue.pop().await.unwrap();
        run_job(&ctx, 0, job).await;

        assert!(ctx.queue.entry(&job_id).is_none());
        assert!(ctx.queue.pending().is_empty());
        let record = store.get(&job_id).unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Succeeded);
        assert_eq!(record.result_summary.unwrap().mean, Some(2.0));
    }

    #[tokio::test]
    async fn test_unpersisted_terminal_state_is_not_published() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore {
            reject_terminal: true,
            ..MemoryStore::default()
        });
        let ctx = context(&dir, store.clone());
        let job_id = enqueue(&ctx, dir.path().join("missing.csv"));

        let job = ctx.queue.pop().await.unwrap();
        run_job(&ctx, 0, job).await;

        let record = store.get(&job_id).unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Started);
        assert_eq!(ctx.queue.status(&job_id), Some(JobStatus::Started));
        assert_eq!(
            JobStatus::reconcile(record.status, ctx.queue.status(&job_id)),
            JobStatus::Started
        );
    }
}
