use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to read {path}: {reason}")]
    ReadFailure { path: PathBuf, reason: String },

    #[error("Computation failed: {0}")]
    ComputeFailure(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Job queue is closed")]
    QueueClosed,
}

/// Client-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    ReadFailure,
    ComputeFailure,
    Internal,
}

impl ProcessingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ProcessingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn read_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ProcessingError::ReadFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessingError::NotFound { .. } => ErrorKind::NotFound,
            ProcessingError::InvalidInput(_) | ProcessingError::Validation(_) => {
                ErrorKind::InvalidInput
            }
            ProcessingError::ReadFailure { .. } | ProcessingError::Csv(_) => ErrorKind::ReadFailure,
            ProcessingError::ComputeFailure(_) => ErrorKind::ComputeFailure,
            ProcessingError::Io(_)
            | ProcessingError::Json(_)
            | ProcessingError::Config(_)
            | ProcessingError::TaskJoin(_)
            | ProcessingError::QueueClosed => ErrorKind::Internal,
        }
    }

    /// True for errors caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        self.kind() != ErrorKind::Internal
    }
}

impl From<config::ConfigError> for ProcessingError {
    fn from(err: config::ConfigError) -> Self {
        ProcessingError::Config(err.to_string())
    }
}
