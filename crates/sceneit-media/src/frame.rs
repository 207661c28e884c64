//! Decoded frame buffers.

use crate::error::{MediaError, MediaResult};
use sceneit_models::video::frame_time;

/// Bytes per pixel of a packed RGB24 buffer.
pub const RGB_CHANNELS: usize = 3;

/// A decoded video frame.
///
/// Pixels are packed RGB24, row-major, `height * width * 3` bytes.
/// Frames are transient: the pipeline drops them as soon as the step
/// that needed them is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Zero-based index in the decoded stream
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a frame from raw RGB24 bytes.
    pub fn new(index: usize, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            index,
            width,
            height,
            data,
        }
    }

    /// Create a frame where every pixel has the same color.
    pub fn filled(index: usize, width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * RGB_CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self::new(index, width, height, data)
    }

    /// Number of pixels in the frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Expected buffer length for the frame dimensions.
    pub fn expected_len(&self) -> usize {
        self.pixel_count() * RGB_CHANNELS
    }

    /// Presentation time in seconds at the given frame rate.
    pub fn timestamp(&self, fps: f64) -> f64 {
        frame_time(self.index, fps)
    }

    /// Check that the buffer is non-empty and matches the dimensions.
    pub fn validate(&self) -> MediaResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MediaError::invalid_frame(
                self.index,
                format!("zero dimension {}x{}", self.width, self.height),
            ));
        }
        if self.data.len() != self.expected_len() {
            return Err(MediaError::invalid_frame(
                self.index,
                format!(
                    "buffer has {} bytes, expected {} for {}x{} RGB24",
                    self.data.len(),
                    self.expected_len(),
                    self.width,
                    self.height
                ),
            ));
        }
        Ok(())
    }

    /// Iterate over pixels as `[r, g, b]` triples.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(RGB_CHANNELS)
    }
}
