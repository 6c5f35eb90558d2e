//! Durable job records, one JSON document per job id.

use crate::error::{ProcessingError, Result};
use crate::models::{Job, JobStatus};
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub trait JobStore: Send + Sync {
    /// Write a new record. Fails if the id is already taken.
    fn insert(&self, job: &Job) -> Result<()>;

    fn get(&self, job_id: &str) -> Result<Option<Job>>;

    /// Overwrite an existing record
    fn save(&self, job: &Job) -> Result<()>;
}

/// Move a record to `next` and apply `update`. A missing record or a
/// disallowed transition is a no-op and returns `false`.
pub fn apply_transition(
    store: &dyn JobStore,
    job_id: &str,
    next: JobStatus,
    update: impl FnOnce(&mut Job),
) -> Result<bool> {
    let Some(mut job) = store.get(job_id)? else {
        warn!("No durable record for job {}, skipping {} update", job_id, next);
        return Ok(false);
    };

    if !job.status.can_transition_to(next) {
        warn!(
            "Ignoring {} -> {} for job {}",
            job.status, next, job_id
        );
        return Ok(false);
    }

    job.status = next;
    update(&mut job);
    job.updated_at = Utc::now();
    store.save(&job)?;
    debug!("Job {} is now {}", job_id, next);
    Ok(true)
}

/// Job ids become file names, so only a conservative alphabet is accepted
pub fn is_valid_job_id(job_id: &str) -> bool {
    !job_id.is_empty()
        && job_id.len() <= 64
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone)]
pub struct FileJobStore {
    dir: PathBuf,
}

impl FileJobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, job_id: &str) -> Result<PathBuf> {
        if !is_valid_job_id(job_id) {
            return Err(ProcessingError::not_found("job", job_id));
        }
        Ok(self.dir.join(format!("{}.json", job_id)))
    }

    /// Write via a temp file in the same directory so readers never see a partial record
    fn write_atomic(&self, path: &Path, job: &Job) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, job)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| ProcessingError::Io(e.error))?;
        Ok(())
    }
}

impl JobStore for FileJobStore {
    fn insert(&self, job: &Job) -> Result<()> {
        let path = self.record_path(&job.job_id)?;
        if path.exists() {
            return Err(ProcessingError::InvalidInput(format!(
                "Job {} already exists",
                job.job_id
            )));
        }
        self.write_atomic(&path, job)
    }

    fn get(&self, job_id: &str) -> Result<Option<Job>> {
        let path = match self.record_path(job_id) {
            Ok(path) => path,
            Err(_) => return Ok(None),
        };
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, job: &Job) -> Result<()> {
        let path = self.record_path(&job.job_id)?;
        self.write_atomic(&path, job)
    }
}
