//! Shot detection configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default smoothed-distance threshold that marks a cut.
pub const DEFAULT_THRESHOLD: f64 = 0.25;
/// Default minimum time between two threshold-triggered cuts.
pub const DEFAULT_MIN_SHOT_LEN_SEC: f64 = 0.7;
/// Default moving-average window over the distance signal.
pub const DEFAULT_SMOOTH_K: usize = 5;
/// Default keyframe sampling rate inside a shot.
pub const DEFAULT_SAMPLES_PER_SECOND: u32 = 4;

/// Shot detection configuration.
///
/// Every heuristic the pipeline uses is exposed here with its default,
/// so a caller can tune detection without touching the algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShotDetectionConfig {
    /// Smoothed Bhattacharyya distance at or above which a frame starts a new shot
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Cooldown after a cut, in seconds, during which no new cut is accepted
    #[serde(default = "default_min_shot_len_sec")]
    pub min_shot_len_sec: f64,

    /// Moving-average window size (0 or 1 disables smoothing)
    #[serde(default = "default_smooth_k")]
    pub smooth_k: usize,

    /// Limit on frames scanned in the forward pass (None = whole video)
    #[serde(default)]
    pub max_frames: Option<usize>,

    /// Hand selected keyframes to the storage sink
    #[serde(default = "default_save_frames")]
    pub save_frames: bool,

    /// Keyframe candidates sampled per second of video (stride = fps / this)
    #[serde(default = "default_samples_per_second")]
    pub samples_per_second: u32,

    /// Upper bound on keyframe candidates per shot (None = no bound).
    /// Long shots widen the stride to stay under the bound.
    #[serde(default)]
    pub samples_per_shot: Option<usize>,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}
fn default_min_shot_len_sec() -> f64 {
    DEFAULT_MIN_SHOT_LEN_SEC
}
fn default_smooth_k() -> usize {
    DEFAULT_SMOOTH_K
}
fn default_save_frames() -> bool {
    true
}
fn default_samples_per_second() -> u32 {
    DEFAULT_SAMPLES_PER_SECOND
}

impl Default for ShotDetectionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_shot_len_sec: DEFAULT_MIN_SHOT_LEN_SEC,
            smooth_k: DEFAULT_SMOOTH_K,
            max_frames: None,
            save_frames: true,
            samples_per_second: DEFAULT_SAMPLES_PER_SECOND,
            samples_per_shot: None,
        }
    }
}

impl ShotDetectionConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new config with updated threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Returns a new config with updated minimum shot length.
    pub fn with_min_shot_len(mut self, seconds: f64) -> Self {
        self.min_shot_len_sec = seconds;
        self
    }

    /// Returns a new config with updated smoothing window.
    pub fn with_smooth_k(mut self, k: usize) -> Self {
        self.smooth_k = k;
        self
    }

    /// Returns a new config that scans at most `max_frames` frames.
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Returns a new config with keyframe saving switched on or off.
    pub fn with_save_frames(mut self, save_frames: bool) -> Self {
        self.save_frames = save_frames;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(format!(
                "threshold must be a finite non-negative number, got {}",
                self.threshold
            ));
        }
        if !self.min_shot_len_sec.is_finite() || self.min_shot_len_sec < 0.0 {
            return Err(format!(
                "min_shot_len_sec must be a finite non-negative number, got {}",
                self.min_shot_len_sec
            ));
        }
        if self.samples_per_second == 0 {
            return Err("samples_per_second must be at least 1".to_string());
        }
        if self.samples_per_shot == Some(0) {
            return Err("samples_per_shot must be at least 1 when set".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShotDetectionConfig::default();
        assert!((config.threshold - 0.25).abs() < f64::EPSILON);
        assert!((config.min_shot_len_sec - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.smooth_k, 5);
        assert_eq!(config.max_frames, None);
        assert!(config.save_frames);
        assert_eq!(config.samples_per_second, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: ShotDetectionConfig =
            serde_json::from_str(r#"{"threshold": 0.4, "max_frames": 50}"#).unwrap();
        assert!((config.threshold - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.max_frames, Some(50));
        assert_eq!(config.smooth_k, DEFAULT_SMOOTH_K);
        assert!(config.save_frames);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ShotDetectionConfig::new().with_threshold(-0.1).validate().is_err());
        assert!(ShotDetectionConfig::new().with_threshold(f64::NAN).validate().is_err());
        assert!(ShotDetectionConfig::new().with_min_shot_len(-1.0).validate().is_err());

        let mut config = ShotDetectionConfig::new();
        config.samples_per_second = 0;
        assert!(config.validate().is_err());

        let mut config = ShotDetectionConfig::new();
        config.samples_per_shot = Some(0);
        assert!(config.validate().is_err());
    }
}
