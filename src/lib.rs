//! Ingestion, validation and asynchronous processing of loosely-structured
//! oceanographic CSV files.
//!
//! The synchronous path ([`service::IngestService`]) sniffs, samples and
//! checks stored files. The asynchronous path ([`jobs::JobOrchestrator`])
//! runs longer transformations on a worker pool with durable job records.

pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod processors;
pub mod readers;
pub mod service;
pub mod storage;
pub mod utils;

pub use error::{ErrorKind, ProcessingError, Result};
