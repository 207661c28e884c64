//! Shot segmentation for decoded video.
//!
//! This crate provides:
//! - HSV histograms and the Bhattacharyya distance signal
//! - Moving-average smoothing and threshold/cooldown boundary detection
//! - SSIM-to-mean keyframe selection per shot
//! - Frame source traits with FFmpeg-backed and in-memory implementations
//! - A pipeline tying it together with cancellation and metrics

pub mod assembler;
pub mod boundary;
pub mod distance;
pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod histogram;
pub mod keyframe;
pub mod metrics;
pub mod pipeline;
pub mod sink;
pub mod smoothing;
pub mod source;
pub mod ssim;

pub use assembler::ShotAssembler;
pub use boundary::{shot_ranges, Boundary, BoundaryDetector, BoundaryKind};
pub use distance::{bhattacharyya_distance, distance_signal, DistanceSignalBuilder};
pub use encode::{encode_jpeg, DEFAULT_JPEG_QUALITY};
pub use error::{MediaError, MediaResult};
pub use ffmpeg::{
    check_ffmpeg, check_ffprobe, probe_video, FfmpegDecoderConfig, FfmpegSeekableReader,
    FfmpegSequentialReader, FfmpegVideoSource, VideoProbe,
};
pub use frame::Frame;
pub use histogram::{HsvHistogram, HISTOGRAM_BINS};
pub use keyframe::{KeyframeChoice, KeyframeSelector};
pub use pipeline::ShotPipeline;
pub use sink::{KeyframeSink, MemoryKeyframeSink};
pub use smoothing::smooth_signal;
pub use source::memory::MemoryVideo;
pub use source::{FrameSource, SeekableFrameReader, SequentialFrameReader};
pub use ssim::{mean_image, structural_similarity, to_grayscale, GrayImage};
