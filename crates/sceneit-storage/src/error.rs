//! Storage error types.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failures talking to the object store or interpreting a source URI.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage misconfigured: {0}")]
    ConfigError(String),

    #[error("no such object: {0}")]
    NotFound(String),

    #[error("keyframe upload failed: {0}")]
    UploadFailed(String),

    #[error("source download failed: {0}")]
    DownloadFailed(String),

    #[error("could not presign URL: {0}")]
    PresignFailed(String),

    #[error("bad s3:// URI: {0}")]
    InvalidUri(String),

    #[error("S3 request failed: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(location: impl Into<String>) -> Self {
        Self::NotFound(location.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn invalid_uri(msg: impl Into<String>) -> Self {
        Self::InvalidUri(msg.into())
    }

    /// Whether the same request may succeed later. Bad input never does.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            Self::ConfigError(_) | Self::NotFound(_) | Self::InvalidUri(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(StorageError::upload_failed("503 Slow Down").is_transient());
        assert!(StorageError::AwsSdk("timeout".into()).is_transient());
        assert!(!StorageError::not_found("s3://b/k").is_transient());
        assert!(!StorageError::invalid_uri("s3://").is_transient());
    }
}
