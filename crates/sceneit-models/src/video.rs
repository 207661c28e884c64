//! Video metadata models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Frame rate substituted when the decoder reports zero (or garbage),
/// so frame-index to seconds conversions never divide by zero.
pub const FPS_EPSILON: f64 = 1e-6;

/// Timing metadata read once from the decoder before scanning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Frames per second (always > 0)
    pub fps: f64,
    /// Frame count reported by the decoder (may be an estimate)
    pub frame_count: usize,
}

impl VideoMetadata {
    /// Create metadata, substituting [`FPS_EPSILON`] for a non-positive
    /// or non-finite frame rate.
    pub fn new(fps: f64, frame_count: usize) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            FPS_EPSILON
        };
        Self { fps, frame_count }
    }

    /// Whether the reported frame rate was replaced by the epsilon fallback.
    pub fn fps_defaulted(&self) -> bool {
        self.fps <= FPS_EPSILON
    }

    /// Convert a frame index to seconds.
    pub fn frame_time(&self, frame_index: usize) -> f64 {
        frame_time(frame_index, self.fps)
    }

    /// Duration in seconds implied by the frame count.
    pub fn duration(&self) -> f64 {
        frame_time(self.frame_count, self.fps)
    }
}

/// Convert a frame index to seconds, guarding against a zero frame rate.
pub fn frame_time(frame_index: usize, fps: f64) -> f64 {
    frame_index as f64 / fps.max(FPS_EPSILON)
}
