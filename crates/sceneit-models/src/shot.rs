//! Shot and run report models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A contiguous run of frames between two detected cuts.
///
/// Frame ranges are half-open: the shot covers `[start_frame, end_frame)`
/// and the next shot starts exactly at this shot's `end_frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Shot {
    /// Position of the boundary pair this shot came from. Stable even when
    /// earlier shots are dropped, so artifact keys do not shift.
    pub shot_index: usize,
    /// First frame of the shot
    pub start_frame: usize,
    /// Boundary frame closing the shot (exclusive)
    pub end_frame: usize,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
    /// Frame chosen to represent the shot
    pub keyframe_frame: usize,
    /// Keyframe time in seconds
    pub keyframe_time: f64,
    /// SSIM of the keyframe against the shot's mean image
    pub keyframe_score: f64,
    /// Storage key of the uploaded keyframe image, if one was stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyframe_key: Option<String>,
    /// Presigned URL of the stored keyframe, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyframe_url: Option<String>,
}

impl Shot {
    /// Duration of the shot in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Number of frames in the shot.
    pub fn frame_count(&self) -> usize {
        self.end_frame - self.start_frame
    }

    /// Keyframe time in whole milliseconds, as used for artifact naming.
    pub fn keyframe_time_ms(&self) -> u64 {
        (self.keyframe_time * 1000.0).round().max(0.0) as u64
    }
}

/// Counters for recoverable problems encountered during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunStats {
    /// Frames the decoder returned but that could not be analysed
    pub invalid_frames: u64,
    /// Boundary pairs with zero or negative length
    pub empty_shots_dropped: u64,
    /// Shots where no sampled frame was readable
    pub no_keyframe_shots_dropped: u64,
    /// Keyframes that could not be handed to the storage sink
    pub keyframe_store_failures: u64,
}

/// Summary statistics of a distance signal, for threshold tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SignalStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl SignalStats {
    /// Compute statistics over a signal. An empty signal yields all zeros.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            mean,
            std: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p90: percentile(&sorted, 90.0),
            p95: percentile(&sorted, 95.0),
            p99: percentile(&sorted, 99.0),
        }
    }
}

/// Linear-interpolated percentile over an already sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Distance signal statistics before and after smoothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SignalReport {
    pub raw: SignalStats,
    pub smoothed: SignalStats,
}

/// Result of one shot detection run over a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShotRun {
    /// Source the frames came from (path or URI)
    pub source: String,
    /// Frame rate used for all time conversions
    pub fps: f64,
    /// Frames actually scanned in the forward pass
    pub frame_count: usize,
    /// Threshold used by the boundary detector
    pub threshold_used: f64,
    /// Minimum shot length used by the boundary detector
    pub min_shot_len_sec: f64,
    /// Smoothing window used
    pub smooth_k: usize,
    /// Detected shots in start order
    pub shots: Vec<Shot>,
    /// Recoverable problems encountered
    pub stats: RunStats,
    /// Distance signal statistics
    pub signal: SignalReport,
}

impl ShotRun {
    /// Number of shots in the run.
    pub fn shot_count(&self) -> usize {
        self.shots.len()
    }

    /// Duration covered by the scanned frames, in seconds.
    pub fn scanned_duration(&self) -> f64 {
        crate::video::frame_time(self.frame_count, self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(start: usize, end: usize) -> Shot {
        Shot {
            shot_index: 0,
            start_frame: start,
            end_frame: end,
            start_time: start as f64 / 30.0,
            end_time: end as f64 / 30.0,
            keyframe_frame: start,
            keyframe_time: 1.2346,
            keyframe_score: 1.0,
            keyframe_key: None,
            keyframe_url: None,
        }
    }

    #[test]
    fn test_shot_duration() {
        let shot = shot(0, 30);
        assert!((shot.duration() - 1.0).abs() < 1e-9);
        assert_eq!(shot.frame_count(), 30);
        assert_eq!(shot.keyframe_time_ms(), 1235);
    }

    #[test]
    fn test_shot_omits_missing_key() {
        let json = serde_json::to_value(shot(0, 10)).unwrap();
        assert!(json.get("keyframe_key").is_none());
    }

    #[test]
    fn test_signal_stats() {
        let values: Vec<f64> = (0..=100).map(|v| v as f64).collect();
        let stats = SignalStats::from_values(&values);
        assert!((stats.mean - 50.0).abs() < 1e-9);
        assert!((stats.min - 0.0).abs() < 1e-9);
        assert!((stats.max - 100.0).abs() < 1e-9);
        assert!((stats.p90 - 90.0).abs() < 1e-9);
        assert!((stats.p99 - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_signal_stats_empty() {
        assert_eq!(SignalStats::from_values(&[]), SignalStats::default());
    }
}
