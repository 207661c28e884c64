//! Shared data models for the SceneIt shot segmentation backend.
//!
//! This crate provides Serde-serializable types for:
//! - Shot detection configuration
//! - Video timing metadata
//! - Shot records and run reports

pub mod config;
pub mod shot;
pub mod video;

// Re-export common types
pub use config::ShotDetectionConfig;
pub use shot::{RunStats, Shot, ShotRun, SignalReport, SignalStats};
pub use video::{frame_time, VideoMetadata, FPS_EPSILON};
