//! Frame source abstraction.
//!
//! The pipeline reads a video twice through two separate capabilities:
//! a sequential reader for the forward histogram pass and a seekable
//! reader for keyframe sampling. Each handle is owned by whoever opened it,
//! so concurrent keyframe workers never share decoder state.

use async_trait::async_trait;
use sceneit_models::VideoMetadata;
use tokio::sync::watch;

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

pub mod memory;

/// Forward-only frame access.
#[async_trait]
pub trait SequentialFrameReader: Send {
    /// Timing metadata, read once when the handle was opened.
    fn metadata(&self) -> VideoMetadata;

    /// Read the next frame. `Ok(None)` marks end of stream.
    ///
    /// A recoverable error ([`MediaError::InvalidFrame`]) consumes one
    /// frame index; the caller may keep reading.
    async fn read_next(&mut self) -> MediaResult<Option<Frame>>;
}

/// Random access to single frames.
#[async_trait]
pub trait SeekableFrameReader: Send {
    /// Read the frame at `index`. `Ok(None)` when it cannot be produced.
    async fn seek_and_read(&mut self, index: usize) -> MediaResult<Option<Frame>>;
}

/// Something frames can be read from.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Human-readable source name (path or URI).
    fn name(&self) -> String;

    /// Open a new sequential reader positioned at frame 0.
    async fn open_sequential(&self) -> MediaResult<Box<dyn SequentialFrameReader>>;

    /// Open a new seekable reader.
    async fn open_seekable(&self) -> MediaResult<Box<dyn SeekableFrameReader>>;
}

/// Return [`MediaError::Cancelled`] once the cancel signal is set.
pub(crate) fn check_cancelled(cancel: Option<&watch::Receiver<bool>>) -> MediaResult<()> {
    match cancel {
        Some(rx) if *rx.borrow() => Err(MediaError::Cancelled),
        _ => Ok(()),
    }
}
