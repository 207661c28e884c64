//! In-memory frame source.
//!
//! Holds decoded frames in memory and serves them through both reader
//! capabilities. Used for tests and for callers that already have frames.
//! Individual frames can be marked corrupt (served with a truncated buffer)
//! or unseekable (random access returns nothing) to exercise recovery paths.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use sceneit_models::VideoMetadata;

use super::{FrameSource, SeekableFrameReader, SequentialFrameReader};
use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

#[derive(Debug, Default)]
struct Inner {
    frames: Vec<Frame>,
    corrupt: HashSet<usize>,
    unseekable: HashSet<usize>,
}

impl Inner {
    fn serve(&self, index: usize) -> Option<Frame> {
        let mut frame = self.frames.get(index)?.clone();
        if self.corrupt.contains(&index) {
            frame.data.truncate(frame.data.len() / 2);
        }
        Some(frame)
    }
}

/// A video held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryVideo {
    name: String,
    fps: f64,
    inner: Arc<Inner>,
}

impl MemoryVideo {
    /// Create a video from frames. Frame indices are reassigned to match
    /// their position.
    pub fn new(name: impl Into<String>, fps: f64, frames: Vec<Frame>) -> Self {
        let frames = frames
            .into_iter()
            .enumerate()
            .map(|(i, mut f)| {
                f.index = i;
                f
            })
            .collect();
        Self {
            name: name.into(),
            fps,
            inner: Arc::new(Inner {
                frames,
                ..Default::default()
            }),
        }
    }

    /// Create a video of solid-color frames, one per entry.
    pub fn from_colors(
        name: impl Into<String>,
        fps: f64,
        width: u32,
        height: u32,
        colors: impl IntoIterator<Item = [u8; 3]>,
    ) -> Self {
        let frames = colors
            .into_iter()
            .enumerate()
            .map(|(i, rgb)| Frame::filled(i, width, height, rgb))
            .collect();
        Self::new(name, fps, frames)
    }

    /// Serve the given frames with a truncated pixel buffer.
    pub fn with_corrupt_frames(self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.update(|inner| inner.corrupt.extend(indices))
    }

    /// Make random access to the given frames return nothing.
    pub fn with_unseekable_frames(self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.update(|inner| inner.unseekable.extend(indices))
    }

    fn update(self, f: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = Arc::try_unwrap(self.inner).unwrap_or_else(|shared| Inner {
            frames: shared.frames.clone(),
            corrupt: shared.corrupt.clone(),
            unseekable: shared.unseekable.clone(),
        });
        f(&mut inner);
        Self {
            name: self.name,
            fps: self.fps,
            inner: Arc::new(inner),
        }
    }

    /// Number of frames held.
    pub fn len(&self) -> usize {
        self.inner.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.frames.is_empty()
    }

    pub fn metadata(&self) -> VideoMetadata {
        VideoMetadata::new(self.fps, self.len())
    }
}

#[async_trait]
impl FrameSource for MemoryVideo {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn open_sequential(&self) -> MediaResult<Box<dyn SequentialFrameReader>> {
        Ok(Box::new(MemorySequentialReader {
            metadata: self.metadata(),
            inner: Arc::clone(&self.inner),
            position: 0,
        }))
    }

    async fn open_seekable(&self) -> MediaResult<Box<dyn SeekableFrameReader>> {
        Ok(Box::new(MemorySeekableReader {
            inner: Arc::clone(&self.inner),
        }))
    }
}

/// Sequential handle over a [`MemoryVideo`].
pub struct MemorySequentialReader {
    metadata: VideoMetadata,
    inner: Arc<Inner>,
    position: usize,
}

#[async_trait]
impl SequentialFrameReader for MemorySequentialReader {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    async fn read_next(&mut self) -> MediaResult<Option<Frame>> {
        let frame = self.inner.serve(self.position);
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }
}

/// Seekable handle over a [`MemoryVideo`].
pub struct MemorySeekableReader {
    inner: Arc<Inner>,
}

#[async_trait]
impl SeekableFrameReader for MemorySeekableReader {
    async fn seek_and_read(&mut self, index: usize) -> MediaResult<Option<Frame>> {
        if self.inner.unseekable.contains(&index) {
            return Ok(None);
        }
        if index >= self.inner.frames.len() {
            return Err(MediaError::invalid_frame(
                index,
                format!("seek past end of {} frames", self.inner.frames.len()),
            ));
        }
        Ok(self.inner.serve(index))
    }
}
