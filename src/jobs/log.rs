//! Append-only per-job execution log, one text file per job id.

use crate::error::{ProcessingError, Result};
use crate::jobs::store::is_valid_job_id;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct JobLog {
    dir: PathBuf,
}

impl JobLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, job_id: &str) -> Result<PathBuf> {
        if !is_valid_job_id(job_id) {
            return Err(ProcessingError::not_found("job", job_id));
        }
        Ok(self.dir.join(format!("{}.log", job_id)))
    }

    /// Append one timestamped line, creating the file on first write
    pub fn append(&self, job_id: &str, message: &str) -> Result<()> {
        let path = self.path(job_id)?;
        fs::create_dir_all(&self.dir)?;

        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S");
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "[{}Z] {}", timestamp, message)?;
        Ok(())
    }

    /// Full log text, empty when nothing has been written yet
    pub fn read(&self, job_id: &str) -> Result<String> {
        match fs::read_to_string(self.path(job_id)?) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Log handle bound to one job, passed explicitly into the work being run
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: String,
    log: JobLog,
}

impl JobContext {
    pub fn new(job_id: impl Into<String>, log: JobLog) -> Self {
        Self {
            job_id: job_id.into(),
            log,
        }
    }

    /// Log a step. A failing log write must not fail the job.
    pub fn log(&self, message: &str) {
        if let Err(e) = self.log.append(&self.job_id, message) {
            tracing::warn!("Could not append to log of job {}: {}", self.job_id, e);
        }
    }
}
