use crate::utils::constants::JOB_KIND_PROCESS_CSV;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Started,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Started => "started",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether a record in this state may move to `next`
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            JobStatus::Queued => next != JobStatus::Queued,
            JobStatus::Started => next.is_terminal(),
            JobStatus::Succeeded | JobStatus::Failed => false,
        }
    }

    /// Merge the durable record's status with the queue's transient one.
    /// A terminal durable state wins; otherwise the live queue state wins.
    pub fn reconcile(durable: JobStatus, transient: Option<JobStatus>) -> JobStatus {
        if durable.is_terminal() {
            return durable;
        }
        transient.unwrap_or(durable)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    ProcessCsv,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ProcessCsv => JOB_KIND_PROCESS_CSV,
        }
    }
}

/// Summary statistics over the non-missing values of a column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl JobStats {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                count: 0,
                min: None,
                max: None,
                mean: None,
            };
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        Self {
            count: values.len(),
            min: Some(min),
            max: Some(max),
            mean: Some(mean),
        }
    }
}

/// Durable job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub dataset_id: u64,
    pub file_id: u64,
    pub input_path: PathBuf,
    pub kind: JobKind,
    pub value_column: String,
    pub status: JobStatus,
    pub result_path: Option<PathBuf>,
    pub result_summary: Option<JobStats>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn queued(job_id: String, unit: &WorkUnit) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            dataset_id: unit.dataset_id,
            file_id: unit.file_id,
            input_path: unit.input_path.clone(),
            kind: unit.kind,
            value_column: unit.value_column.clone(),
            status: JobStatus::Queued,
            result_path: None,
            result_summary: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Opaque description of one job's input, carried by the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub kind: JobKind,
    pub dataset_id: u64,
    pub file_id: u64,
    pub input_path: PathBuf,
    pub value_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitRequest {
    pub dataset_id: u64,

    /// Latest uploaded file when absent
    pub file_id: Option<u64>,

    #[validate(length(min = 1, max = 256))]
    pub value_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub dataset_id: u64,
    pub file_id: u64,
    pub value_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub dataset_id: u64,
    pub input_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<JobStats>,
}
