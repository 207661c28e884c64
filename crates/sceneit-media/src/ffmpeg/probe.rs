//! FFprobe stream information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Video stream information needed for frame decoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoProbe {
    /// Coded width in pixels
    pub width: u32,
    /// Coded height in pixels
    pub height: u32,
    /// Frame rate (fps), 0 if unknown
    pub fps: f64,
    /// Frame count from the container, or estimated from duration
    pub frame_count: usize,
    /// Duration in seconds
    pub duration: f64,
    /// Video codec
    pub codec: String,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// Probe a video file for its first video stream.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoProbe> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe failed on {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe = parse_probe_output(&path.display().to_string(), &output.stdout)?;
    debug!(
        path = %path.display(),
        width = probe.width,
        height = probe.height,
        fps = probe.fps,
        frame_count = probe.frame_count,
        "Probed video"
    );
    Ok(probe)
}

/// Parse FFprobe JSON into a [`VideoProbe`].
pub(crate) fn parse_probe_output(source_name: &str, json: &[u8]) -> MediaResult<VideoProbe> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::video_open(source_name, "No video stream found"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(MediaError::video_open(
                source_name,
                "Video stream has no dimensions",
            ))
        }
    };

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(0.0);

    let duration = stream
        .duration
        .as_deref()
        .or(probe.format.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| (duration * fps).round() as usize);

    Ok(VideoProbe {
        width,
        height,
        fps,
        frame_count,
        duration,
        codec: stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
///
/// Returns `None` for unparseable or non-positive rates (ffprobe reports
/// `0/0` when it does not know).
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        s.parse().ok()?
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
        assert!(parse_frame_rate("abc").is_none());
    }

    #[test]
    fn test_parse_probe_with_nb_frames() {
        let json = br#"{
            "format": {"duration": "10.000000"},
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720,
                 "r_frame_rate": "30/1", "avg_frame_rate": "30/1", "nb_frames": "300"}
            ]
        }"#;
        let probe = parse_probe_output("test.mp4", json).unwrap();
        assert_eq!((probe.width, probe.height), (1280, 720));
        assert_eq!(probe.frame_count, 300);
        assert!((probe.fps - 30.0).abs() < 1e-9);
        assert_eq!(probe.codec, "h264");
    }

    #[test]
    fn test_frame_count_estimated_from_duration() {
        let json = br#"{
            "format": {"duration": "5.0"},
            "streams": [
                {"codec_type": "video", "width": 64, "height": 48,
                 "avg_frame_rate": "0/0", "r_frame_rate": "25/1"}
            ]
        }"#;
        let probe = parse_probe_output("test.mp4", json).unwrap();
        assert!((probe.fps - 25.0).abs() < 1e-9);
        assert_eq!(probe.frame_count, 125);
    }

    #[test]
    fn test_missing_video_stream() {
        let json = br#"{"format": {}, "streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(
            parse_probe_output("test.mp4", json),
            Err(MediaError::VideoOpen { .. })
        ));
    }
}
