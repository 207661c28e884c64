//! Shot detection worker.
//!
//! This crate provides:
//! - Environment configuration
//! - Source resolution for local paths and `s3://` URIs
//! - Keyframe upload through a storage-backed sink
//! - Run logging and a Prometheus snapshot of the run

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod sink;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::RunLogger;
pub use processor::ShotProcessor;
pub use sink::StorageKeyframeSink;
