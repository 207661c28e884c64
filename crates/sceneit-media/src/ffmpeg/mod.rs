//! FFmpeg/FFprobe decoding collaborator.

pub mod command;
pub mod decoder;
pub mod probe;

pub use command::{check_ffmpeg, check_ffprobe, RawFrameCommand};
pub use decoder::{
    FfmpegDecoderConfig, FfmpegSeekableReader, FfmpegSequentialReader, FfmpegVideoSource,
    DEFAULT_SEEK_EPSILON_SEC,
};
pub use probe::{probe_video, VideoProbe};
