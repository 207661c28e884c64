//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during shot detection.
///
/// Only [`MediaError::is_fatal`] errors abort a run. Frame- and shot-level
/// errors are recovered where they happen and surface as run statistics.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Failed to open video {source_name}: {message}")]
    VideoOpen {
        source_name: String,
        message: String,
    },

    #[error("Invalid frame {index}: {message}")]
    InvalidFrame { index: usize, message: String },

    #[error("Empty shot [{start_frame}, {end_frame})")]
    EmptyShot {
        start_frame: usize,
        end_frame: usize,
    },

    #[error("No readable keyframe candidate in shot [{start_frame}, {end_frame})")]
    NoKeyframe {
        start_frame: usize,
        end_frame: usize,
    },

    #[error("Invalid frame rate: {0}")]
    InvalidFps(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Keyframe sink failed: {0}")]
    Sink(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a video open error.
    pub fn video_open(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VideoOpen {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid frame error.
    pub fn invalid_frame(index: usize, message: impl Into<String>) -> Self {
        Self::InvalidFrame {
            index,
            message: message.into(),
        }
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a keyframe sink error.
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink(message.into())
    }

    /// Whether this error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MediaError::InvalidFrame { .. }
                | MediaError::EmptyShot { .. }
                | MediaError::NoKeyframe { .. }
                | MediaError::Encode(_)
                | MediaError::Sink(_)
        )
    }
}
