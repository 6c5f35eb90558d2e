//! In-process job queue: hands each unit of work to exactly one worker and
//! tracks transient status while the process is alive.

use crate::error::{ProcessingError, Result};
use crate::models::{JobStatus, WorkUnit};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: String,
    pub unit: WorkUnit,
}

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub unit: WorkUnit,
    pub status: JobStatus,
}

pub struct JobQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<QueuedJob>>,
    entries: RwLock<HashMap<String, QueueEntry>>,
}

impl JobQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate an opaque id for the next unit of work
    pub fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Make a unit of work visible to workers
    pub fn push(&self, job_id: String, unit: WorkUnit) -> Result<()> {
        let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let sender = guard.as_ref().ok_or(ProcessingError::QueueClosed)?;

        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                job_id.clone(),
                QueueEntry {
                    unit: unit.clone(),
                    status: JobStatus::Queued,
                },
            );

        sender.send(QueuedJob { job_id: job_id.clone(), unit }).map_err(|_| {
            self.entries
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&job_id);
            ProcessingError::QueueClosed
        })
    }

    /// Next unit of work; `None` once the queue is closed and drained
    pub async fn pop(&self) -> Option<QueuedJob> {
        self.receiver.lock().await.recv().await
    }

    /// Stop accepting work. Already queued units are still handed out.
    pub fn close(&self) {
        self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub fn set_status(&self, job_id: &str, status: JobStatus) {
        if let Some(entry) = self
            .entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(job_id)
        {
            entry.status = status;
        }
    }

    /// Forget a job once its durable record is authoritative
    pub fn remove(&self, job_id: &str) -> Option<QueueEntry> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(job_id)
    }

    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.entry(job_id).map(|entry| entry.status)
    }

    pub fn entry(&self, job_id: &str) -> Option<QueueEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(job_id)
            .cloned()
    }

    /// Ids still waiting or running
    pub fn pending(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(_, entry)| !entry.status.is_terminal())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
