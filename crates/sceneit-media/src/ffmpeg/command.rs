//! FFmpeg command builder for raw RGB24 frame output.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// Builder for an FFmpeg invocation that writes packed RGB24 frames to
/// stdout.
#[derive(Debug, Clone)]
pub struct RawFrameCommand {
    /// Input file path
    input: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Keep only this decoded frame number
    select_frame: Option<usize>,
    /// Output frame size
    scale: Option<(u32, u32)>,
    /// Log level
    log_level: String,
}

impl RawFrameCommand {
    /// Create a new command reading `input`.
    ///
    /// Autorotation is disabled so the output matches the coded stream
    /// dimensions reported by FFprobe.
    pub fn new(input: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            input_args: vec!["-noautorotate".to_string()],
            output_args: Vec::new(),
            select_frame: None,
            scale: None,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.6}", seconds))
    }

    /// Scale output frames to exactly `width`×`height`.
    pub fn scale(mut self, width: u32, height: u32) -> Self {
        self.scale = Some((width, height));
        self
    }

    /// Decode from the start and keep only frame number `index`.
    ///
    /// Used instead of [`seek`](Self::seek) when timestamps cannot be
    /// derived from the frame rate.
    pub fn select_frame(mut self, index: usize) -> Self {
        self.select_frame = Some(index);
        self
    }

    /// Video filter chain, `None` when no filter is needed.
    fn filter_chain(&self) -> Option<String> {
        let mut filters = Vec::new();
        if let Some(index) = self.select_frame {
            filters.push(format!("select=eq(n\\,{})", index));
        }
        if let Some((w, h)) = self.scale {
            filters.push(format!("scale={}:{}", w, h));
        }
        (!filters.is_empty()).then(|| filters.join(","))
    }

    /// Stop after `count` frames.
    pub fn frames(self, count: usize) -> Self {
        self.output_arg("-frames:v").output_arg(count.to_string())
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            self.log_level.clone(),
        ];
        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        if let Some(chain) = self.filter_chain() {
            args.push("-vf".to_string());
            args.push(chain);
        }
        args.extend(self.output_args.iter().cloned());
        args.extend(
            ["-an", "-pix_fmt", "rgb24", "-f", "rawvideo", "-"]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
