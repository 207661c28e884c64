//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sceneit_media::{FfmpegDecoderConfig, DEFAULT_JPEG_QUALITY};
use sceneit_models::ShotDetectionConfig;
use sceneit_storage::StorageConfig;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work directory for downloaded sources
    pub work_dir: String,
    /// Upper bound on one run, download included
    pub job_timeout: Duration,
    /// Detection parameters
    pub detection: ShotDetectionConfig,
    /// Decoder tuning
    pub decoder: FfmpegDecoderConfig,
    /// JPEG quality of uploaded keyframes (1-100)
    pub jpeg_quality: u8,
    /// Attach presigned GET URLs valid this long to stored keyframes
    pub keyframe_url_expiry: Option<Duration>,
    /// Write a Prometheus text snapshot here after the run
    pub metrics_path: Option<PathBuf>,
    /// Object storage; keyframes are not stored and `s3://` sources are
    /// rejected when absent
    pub storage: Option<StorageConfig>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/sceneit".to_string(),
            job_timeout: Duration::from_secs(3600), // 1 hour
            detection: ShotDetectionConfig::default(),
            decoder: FfmpegDecoderConfig::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            keyframe_url_expiry: None,
            metrics_path: None,
            storage: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Storage is configured when `S3_BUCKET` is set.
    pub fn from_env() -> Self {
        Self {
            storage: StorageConfig::from_env().ok(),
            ..Self::from_lookup(|name| std::env::var(name).ok())
        }
    }

    /// Build the non-storage settings from an arbitrary variable lookup.
    /// Unset or unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let parse = |name: &str| get(name).and_then(|v| v.trim().parse::<f64>().ok());

        let mut detection = ShotDetectionConfig::default();
        if let Some(threshold) = parse("SHOTS_THRESHOLD") {
            detection.threshold = threshold;
        }
        if let Some(seconds) = parse("SHOTS_MIN_SHOT_LEN_SEC") {
            detection.min_shot_len_sec = seconds;
        }
        if let Some(k) = parsed(get("SHOTS_SMOOTH_K")) {
            detection.smooth_k = k;
        }
        detection.max_frames = parsed(get("SHOTS_MAX_FRAMES"));
        if let Some(save) = get("SHOTS_SAVE_FRAMES").and_then(|v| parse_bool(&v)) {
            detection.save_frames = save;
        }
        if let Some(rate) = parsed(get("SHOTS_SAMPLES_PER_SECOND")) {
            detection.samples_per_second = rate;
        }
        detection.samples_per_shot = parsed(get("SHOTS_SAMPLES_PER_SHOT"));

        let mut decoder = FfmpegDecoderConfig::default();
        if let Some(width) = parsed::<u32>(get("DECODER_MAX_WIDTH")).filter(|w| *w > 0) {
            decoder = decoder.with_max_width(width);
        }
        if let Some(epsilon) = parse("DECODER_SEEK_EPSILON_SEC") {
            decoder = decoder.with_seek_epsilon(epsilon);
        }

        Self {
            work_dir: get("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
            job_timeout: parsed(get("WORKER_JOB_TIMEOUT"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_timeout),
            detection,
            decoder,
            jpeg_quality: parsed(get("KEYFRAME_JPEG_QUALITY")).unwrap_or(defaults.jpeg_quality),
            keyframe_url_expiry: parsed::<u64>(get("KEYFRAME_URL_EXPIRY_SECS"))
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            metrics_path: get("WORKER_METRICS_PATH").map(PathBuf::from),
            storage: None,
        }
    }

    /// Check the settings a run depends on.
    pub fn validate(&self) -> WorkerResult<()> {
        self.detection
            .validate()
            .map_err(WorkerError::config_error)?;

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(WorkerError::config_error(format!(
                "KEYFRAME_JPEG_QUALITY must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if !(self.decoder.seek_epsilon_sec.is_finite() && self.decoder.seek_epsilon_sec >= 0.0) {
            return Err(WorkerError::config_error(format!(
                "DECODER_SEEK_EPSILON_SEC must be a non-negative number, got {}",
                self.decoder.seek_epsilon_sec
            )));
        }
        if self.job_timeout.is_zero() {
            return Err(WorkerError::config_error("WORKER_JOB_TIMEOUT must be positive"));
        }
        Ok(())
    }

    /// Whether keyframes will actually be uploaded.
    pub fn stores_keyframes(&self) -> bool {
        self.detection.save_frames && self.storage.is_some()
    }
}

fn parsed<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> WorkerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.work_dir, "/tmp/sceneit");
        assert_eq!(config.detection, ShotDetectionConfig::default());
        assert_eq!(config.decoder, FfmpegDecoderConfig::default());
        assert_eq!(config.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert!(config.keyframe_url_expiry.is_none());
        assert!(config.metrics_path.is_none());
        assert!(!config.stores_keyframes());
        config.validate().unwrap();
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("WORKER_WORK_DIR", "/data/work"),
            ("WORKER_JOB_TIMEOUT", "120"),
            ("SHOTS_THRESHOLD", "0.4"),
            ("SHOTS_MIN_SHOT_LEN_SEC", "1.5"),
            ("SHOTS_SMOOTH_K", "3"),
            ("SHOTS_MAX_FRAMES", "900"),
            ("SHOTS_SAVE_FRAMES", "false"),
            ("SHOTS_SAMPLES_PER_SECOND", "2"),
            ("SHOTS_SAMPLES_PER_SHOT", "16"),
            ("DECODER_MAX_WIDTH", "640"),
            ("DECODER_SEEK_EPSILON_SEC", "0.002"),
            ("KEYFRAME_JPEG_QUALITY", "75"),
            ("KEYFRAME_URL_EXPIRY_SECS", "600"),
            ("WORKER_METRICS_PATH", "/tmp/metrics.prom"),
        ]);

        assert_eq!(config.work_dir, "/data/work");
        assert_eq!(config.job_timeout, Duration::from_secs(120));
        assert_eq!(config.detection.threshold, 0.4);
        assert_eq!(config.detection.min_shot_len_sec, 1.5);
        assert_eq!(config.detection.smooth_k, 3);
        assert_eq!(config.detection.max_frames, Some(900));
        assert!(!config.detection.save_frames);
        assert_eq!(config.detection.samples_per_second, 2);
        assert_eq!(config.detection.samples_per_shot, Some(16));
        assert_eq!(config.decoder.max_width, Some(640));
        assert_eq!(config.decoder.seek_epsilon_sec, 0.002);
        assert_eq!(config.jpeg_quality, 75);
        assert_eq!(config.keyframe_url_expiry, Some(Duration::from_secs(600)));
        assert_eq!(config.metrics_path, Some(PathBuf::from("/tmp/metrics.prom")));
        config.validate().unwrap();
    }

    #[test]
    fn test_unparsable_values_keep_defaults() {
        let config = config_from(&[
            ("SHOTS_THRESHOLD", "high"),
            ("SHOTS_SMOOTH_K", "-1"),
            ("SHOTS_SAVE_FRAMES", "maybe"),
            ("KEYFRAME_JPEG_QUALITY", "300"),
            ("WORKER_WORK_DIR", "  "),
        ]);
        assert_eq!(config.detection.threshold, 0.25);
        assert_eq!(config.detection.smooth_k, 5);
        assert!(config.detection.save_frames);
        assert_eq!(config.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(config.work_dir, "/tmp/sceneit");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = config_from(&[("SHOTS_THRESHOLD", "-0.5")]);
        assert!(matches!(config.validate(), Err(WorkerError::ConfigError(_))));

        let config = config_from(&[("KEYFRAME_JPEG_QUALITY", "0")]);
        assert!(config.validate().is_err());

        let config = config_from(&[("SHOTS_SAMPLES_PER_SECOND", "0")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("sometimes"), None);
    }
}
