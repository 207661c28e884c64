//! Shot detection metrics.
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! host process installs a recorder.

use metrics::{counter, histogram};

pub mod names {
    pub const FRAMES_SCANNED: &str = "sceneit_frames_scanned_total";
    pub const INVALID_FRAMES: &str = "sceneit_invalid_frames_total";
    pub const SHOTS_EMITTED: &str = "sceneit_shots_emitted_total";
    pub const SHOTS_DROPPED: &str = "sceneit_shots_dropped_total";
    pub const KEYFRAME_STORE_FAILURES: &str = "sceneit_keyframe_store_failures_total";
    pub const PIPELINE_DURATION: &str = "sceneit_pipeline_duration_seconds";
}

pub fn record_frames_scanned(count: usize) {
    counter!(names::FRAMES_SCANNED).increment(count as u64);
}

pub fn record_invalid_frame() {
    counter!(names::INVALID_FRAMES).increment(1);
}

pub fn record_shots_emitted(count: usize) {
    counter!(names::SHOTS_EMITTED).increment(count as u64);
}

/// Record a dropped shot. `reason` is `empty` or `no_keyframe`.
pub fn record_shot_dropped(reason: &'static str) {
    counter!(names::SHOTS_DROPPED, "reason" => reason).increment(1);
}

pub fn record_keyframe_store_failure() {
    counter!(names::KEYFRAME_STORE_FAILURES).increment(1);
}

pub fn record_pipeline_duration(outcome: &'static str, duration_secs: f64) {
    histogram!(names::PIPELINE_DURATION, "outcome" => outcome).record(duration_secs);
}
