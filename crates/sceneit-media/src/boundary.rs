//! Shot boundary detection over the smoothed distance signal.
//!
//! # Algorithm
//! 1. Frame 0 always opens the first shot
//! 2. Scan the signal in order; frame `i` at time `t = i / fps` becomes a
//!    cut when `signal[i] >= threshold` and at least `min_shot_len_sec` has
//!    elapsed since the previous cut
//! 3. Close the last shot at the final frame index
//!
//! The cooldown keeps the burst of high-distance frames around a real cut
//! (widened by smoothing) from producing a run of micro-shots.
//!
//! A threshold crossing on the final frame is recorded as the closing
//! boundary instead of a cut, since a shot starting there would be empty.

use sceneit_models::video::frame_time;
use sceneit_models::ShotDetectionConfig;
use tracing::debug;

/// Why a boundary exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Frame 0, opening the first shot
    Start,
    /// Threshold crossing that passed the cooldown
    Cut,
    /// Final frame index, closing the last shot
    Closing,
}

/// A shot boundary at a frame index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub frame: usize,
    /// Boundary time in seconds
    pub time: f64,
    /// Smoothed signal value at the boundary frame
    pub score: f64,
    pub kind: BoundaryKind,
}

/// Threshold-and-cooldown boundary detector.
#[derive(Debug, Clone)]
pub struct BoundaryDetector {
    threshold: f64,
    min_shot_len_sec: f64,
}

impl Default for BoundaryDetector {
    fn default() -> Self {
        Self::from_config(&ShotDetectionConfig::default())
    }
}

impl BoundaryDetector {
    /// Create a detector with explicit parameters.
    pub fn new(threshold: f64, min_shot_len_sec: f64) -> Self {
        Self {
            threshold,
            min_shot_len_sec,
        }
    }

    /// Create a detector from the run configuration.
    pub fn from_config(config: &ShotDetectionConfig) -> Self {
        Self::new(config.threshold, config.min_shot_len_sec)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn min_shot_len_sec(&self) -> f64 {
        self.min_shot_len_sec
    }

    /// Detect boundaries in a smoothed signal sampled at `fps`.
    ///
    /// The result always starts with frame 0. For a signal of length
    /// `n > 1` it always ends with frame `n - 1`.
    pub fn detect(&self, signal: &[f64], fps: f64) -> Vec<Boundary> {
        let mut boundaries = vec![Boundary {
            frame: 0,
            time: 0.0,
            score: signal.first().copied().unwrap_or(0.0),
            kind: BoundaryKind::Start,
        }];

        let Some(last_index) = signal.len().checked_sub(1) else {
            return boundaries;
        };

        let mut last_cut_time = 0.0;
        for (i, &score) in signal.iter().enumerate().skip(1) {
            let t = frame_time(i, fps);
            if score >= self.threshold && (t - last_cut_time) >= self.min_shot_len_sec {
                let kind = if i == last_index {
                    BoundaryKind::Closing
                } else {
                    BoundaryKind::Cut
                };
                debug!(
                    frame = i,
                    time = format!("{:.3}", t),
                    score = format!("{:.3}", score),
                    "Shot boundary"
                );
                boundaries.push(Boundary {
                    frame: i,
                    time: t,
                    score,
                    kind,
                });
                last_cut_time = t;
            }
        }

        let closed = boundaries
            .last()
            .map(|b| b.frame == last_index)
            .unwrap_or(false);
        if !closed {
            boundaries.push(Boundary {
                frame: last_index,
                time: frame_time(last_index, fps),
                score: signal[last_index],
                kind: BoundaryKind::Closing,
            });
        }

        boundaries
    }
}

/// Consecutive boundary pairs as half-open `[start, end)` frame ranges.
pub fn shot_ranges(boundaries: &[Boundary]) -> Vec<(usize, usize)> {
    boundaries
        .windows(2)
        .map(|pair| (pair[0].frame, pair[1].frame))
        .collect()
}
