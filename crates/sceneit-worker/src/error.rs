//! Worker error types.

use std::time::Duration;

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid worker configuration: {0}")]
    ConfigError(String),

    #[error("shot run failed: {0}")]
    ProcessingFailed(String),

    #[error("shot run exceeded {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Storage(#[from] sceneit_storage::StorageError),

    #[error(transparent)]
    Media(#[from] sceneit_media::MediaError),

    #[error("worker I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("serializing run output: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    /// Whether re-running the same video could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Timeout(_) | WorkerError::Io(_) => true,
            WorkerError::Storage(e) => e.is_transient(),
            WorkerError::Media(e) => matches!(
                e,
                sceneit_media::MediaError::FfmpegFailed { .. } | sceneit_media::MediaError::Io(_)
            ),
            _ => false,
        }
    }

    /// The run stopped because cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Media(sceneit_media::MediaError::Cancelled))
    }
}
