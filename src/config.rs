//! Layered runtime settings: built-in defaults, then an optional TOML file,
//! then `OA_`-prefixed environment variables.

use crate::error::Result;
use crate::utils::constants::{
    DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_MAX_FILE_SIZE, JOBS_DIR, LOGS_DIR, MAX_DEFAULT_WORKERS,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use validator::{Validate, ValidationError};

/// Settings file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_NAME: &str = "oa-datahub";
pub const ENV_PREFIX: &str = "OA";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Settings {
    /// Root of uploaded datasets
    pub data_dir: PathBuf,

    /// Root of derived outputs, job records and job logs
    pub processed_dir: PathBuf,

    /// Ceiling for uploads and for full reads
    #[validate(range(min = 1))]
    pub max_file_size_bytes: u64,

    #[validate(range(min = 1, max = 64))]
    pub worker_count: usize,

    #[validate(range(min = 1))]
    pub job_timeout_secs: u64,

    #[validate(custom(function = "validate_log_level"))]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            processed_dir: PathBuf::from("processed"),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            worker_count: default_worker_count(),
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings. An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().into_owned())?
            .set_default(
                "processed_dir",
                defaults.processed_dir.to_string_lossy().into_owned(),
            )?
            .set_default("max_file_size_bytes", defaults.max_file_size_bytes)?
            .set_default("worker_count", defaults.worker_count as u64)?
            .set_default("job_timeout_secs", defaults.job_timeout_secs)?
            .set_default("log_level", defaults.log_level)?;

        builder = match path {
            Some(path) => builder.add_source(File::from(path.to_path_buf()).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.processed_dir.join(LOGS_DIR)
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.processed_dir.join(JOBS_DIR)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

/// Small pool sized from the machine, never below one worker
pub fn default_worker_count() -> usize {
    num_cpus::get().min(MAX_DEFAULT_WORKERS).max(1)
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_log_level"))
    }
}
