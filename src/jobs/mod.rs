//! Asynchronous job subsystem: durable records, a transient queue, a worker
//! pool and per-job execution logs.

pub mod log;
pub mod orchestrator;
pub mod queue;
pub mod store;
pub mod transform;
pub mod worker;

pub use log::{JobContext, JobLog};
pub use orchestrator::{JobOrchestrator, JobResultFile};
pub use queue::JobQueue;
pub use store::{FileJobStore, JobStore};
pub use transform::CsvTransform;
pub use worker::{WorkerContext, WorkerPool};
