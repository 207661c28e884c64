//! FFmpeg-backed frame source.
//!
//! The sequential reader streams every frame through one long-running
//! FFmpeg process writing RGB24 to a pipe. The seekable reader starts a
//! short FFmpeg process per requested frame, seeking to the frame's
//! timestamp nudged forward by a small epsilon so rounding never lands on
//! the previous frame. Without a usable frame rate there is no timestamp to
//! seek to, so the frame is picked by its decode number instead.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use sceneit_models::VideoMetadata;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::command::{check_ffmpeg, RawFrameCommand};
use super::probe::{probe_video, VideoProbe};
use crate::error::{MediaError, MediaResult};
use crate::frame::{Frame, RGB_CHANNELS};
use crate::source::{FrameSource, SeekableFrameReader, SequentialFrameReader};

/// Default inward nudge applied to seek timestamps.
pub const DEFAULT_SEEK_EPSILON_SEC: f64 = 0.001;

/// Decoder tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegDecoderConfig {
    /// Downscale frames wider than this for analysis (None = native size)
    pub max_width: Option<u32>,
    /// Seconds added to `index / fps` when seeking to a frame
    pub seek_epsilon_sec: f64,
}

impl Default for FfmpegDecoderConfig {
    fn default() -> Self {
        Self {
            max_width: None,
            seek_epsilon_sec: DEFAULT_SEEK_EPSILON_SEC,
        }
    }
}

impl FfmpegDecoderConfig {
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub fn with_seek_epsilon(mut self, seconds: f64) -> Self {
        self.seek_epsilon_sec = seconds;
        self
    }

    /// Output frame size for a stream of `width`×`height`.
    ///
    /// Downscaling keeps the aspect ratio and rounds the height to an even
    /// number, as most scalers require.
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        match self.max_width {
            Some(max) if max > 0 && width > max => {
                let scaled = (height as f64 * max as f64 / width as f64 / 2.0).round() * 2.0;
                (max, (scaled as u32).max(2))
            }
            _ => (width, height),
        }
    }
}

/// A video file decoded through FFmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegVideoSource {
    path: PathBuf,
    config: FfmpegDecoderConfig,
    probe: VideoProbe,
    metadata: VideoMetadata,
    output_size: (u32, u32),
}

impl FfmpegVideoSource {
    /// Probe `path` and prepare it for decoding.
    ///
    /// Missing tools are reported as such; every other failure to read the
    /// stream information becomes [`MediaError::VideoOpen`].
    pub async fn open(path: impl AsRef<Path>, config: FfmpegDecoderConfig) -> MediaResult<Self> {
        let path = path.as_ref().to_path_buf();
        check_ffmpeg()?;

        let probe = match probe_video(&path).await {
            Ok(probe) => probe,
            Err(e @ (MediaError::FfprobeNotFound | MediaError::VideoOpen { .. })) => {
                return Err(e)
            }
            Err(e) => return Err(MediaError::video_open(path.display().to_string(), e.to_string())),
        };

        let metadata = VideoMetadata::new(probe.fps, probe.frame_count);
        if metadata.fps_defaulted() {
            warn!(path = %path.display(), "Frame rate unknown, using epsilon fallback");
        }
        let output_size = config.output_size(probe.width, probe.height);

        info!(
            path = %path.display(),
            width = probe.width,
            height = probe.height,
            output_width = output_size.0,
            output_height = output_size.1,
            fps = metadata.fps,
            frame_count = metadata.frame_count,
            "Opened video"
        );

        Ok(Self {
            path,
            config,
            probe,
            metadata,
            output_size,
        })
    }

    pub fn probe(&self) -> &VideoProbe {
        &self.probe
    }

    pub fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn base_command(&self) -> RawFrameCommand {
        let command = RawFrameCommand::new(&self.path);
        let (w, h) = self.output_size;
        if (w, h) != (self.probe.width, self.probe.height) {
            command.scale(w, h)
        } else {
            command
        }
    }
}

#[async_trait]
impl FrameSource for FfmpegVideoSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn open_sequential(&self) -> MediaResult<Box<dyn SequentialFrameReader>> {
        let args = self.base_command().build_args();
        debug!("[DECODER] Starting sequential decode: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None, None)
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("Failed to capture FFmpeg stdout", None, None)
        })?;
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                buf
            })
        });

        let (width, height) = self.output_size;
        Ok(Box::new(FfmpegSequentialReader {
            metadata: self.metadata,
            child,
            stdout: BufReader::new(stdout),
            stderr_task,
            width,
            height,
            next_index: 0,
            finished: false,
        }))
    }

    async fn open_seekable(&self) -> MediaResult<Box<dyn SeekableFrameReader>> {
        Ok(Box::new(FfmpegSeekableReader {
            source: self.clone(),
        }))
    }
}

/// Streams frames from a single FFmpeg process.
pub struct FfmpegSequentialReader {
    metadata: VideoMetadata,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr_task: Option<JoinHandle<Vec<u8>>>,
    width: u32,
    height: u32,
    next_index: usize,
    finished: bool,
}

impl FfmpegSequentialReader {
    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * RGB_CHANNELS
    }

    /// Reap the process once the pipe is drained.
    async fn finish(&mut self) -> MediaResult<()> {
        self.finished = true;
        let status = self.child.wait().await?;
        let stderr = match self.stderr_task.take() {
            Some(task) => task.await.ok(),
            None => None,
        }
        .map(|buf| String::from_utf8_lossy(&buf).trim().to_string())
        .filter(|s| !s.is_empty());

        if status.success() {
            debug!(frames = self.next_index, "[DECODER] Sequential decode finished");
            return Ok(());
        }

        if self.next_index == 0 {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg produced no frames",
                stderr,
                status.code(),
            ));
        }

        warn!(
            frames = self.next_index,
            exit_code = ?status.code(),
            stderr = stderr.as_deref().unwrap_or(""),
            "[DECODER] FFmpeg exited with an error, treating as end of stream"
        );
        Ok(())
    }
}

#[async_trait]
impl SequentialFrameReader for FfmpegSequentialReader {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    async fn read_next(&mut self) -> MediaResult<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut data = vec![0u8; self.frame_len()];
        let filled = read_full(&mut self.stdout, &mut data).await?;

        if filled < data.len() {
            if filled > 0 {
                debug!(
                    bytes = filled,
                    "[DECODER] Discarding trailing partial frame"
                );
            }
            self.finish().await?;
            return Ok(None);
        }

        let frame = Frame::new(self.next_index, self.width, self.height, data);
        self.next_index += 1;
        Ok(Some(frame))
    }
}

/// Reads single frames by seeking, one FFmpeg process per frame.
pub struct FfmpegSeekableReader {
    source: FfmpegVideoSource,
}

impl FfmpegSeekableReader {
    /// Seek timestamp for a frame index.
    pub fn seek_time(&self, index: usize) -> f64 {
        self.source.metadata.frame_time(index) + self.source.config.seek_epsilon_sec
    }

    /// Command producing the single frame at `index`.
    fn frame_command(&self, index: usize) -> RawFrameCommand {
        let command = self.source.base_command();
        let command = if self.source.metadata.fps_defaulted() {
            command.select_frame(index)
        } else {
            command.seek(self.seek_time(index))
        };
        command.frames(1)
    }
}

#[async_trait]
impl SeekableFrameReader for FfmpegSeekableReader {
    async fn seek_and_read(&mut self, index: usize) -> MediaResult<Option<Frame>> {
        let args = self.frame_command(index).build_args();

        let output = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        let (width, height) = self.source.output_size;
        let frame_len = width as usize * height as usize * RGB_CHANNELS;

        if !output.status.success() || output.stdout.len() < frame_len {
            debug!(
                frame = index,
                bytes = output.stdout.len(),
                exit_code = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "[DECODER] Seek produced no frame"
            );
            return Ok(None);
        }

        let mut data = output.stdout;
        data.truncate(frame_len);
        Ok(Some(Frame::new(index, width, height, data)))
    }
}

/// Read until `buf` is full or the stream ends; returns bytes read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> MediaResult<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
