//! End-to-end shot detection over a frame source.
//!
//! 1. Forward pass: decode sequentially, reduce each frame to a histogram
//!    and stream it into the distance signal (only the previous histogram
//!    is kept alive)
//! 2. Smooth the signal and detect boundaries
//! 3. Keyframe pass: one seekable handle, random access inside each shot
//!
//! Frame-level problems are counted and skipped. Only failing to open the
//! source, an unusable frame rate, a decoder failure and cancellation end
//! the run with an error.

use std::time::Instant;

use sceneit_models::{RunStats, ShotDetectionConfig, ShotRun, SignalReport, SignalStats};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::assembler::ShotAssembler;
use crate::boundary::{shot_ranges, BoundaryDetector};
use crate::distance::DistanceSignalBuilder;
use crate::error::{MediaError, MediaResult};
use crate::histogram::HsvHistogram;
use crate::keyframe::KeyframeSelector;
use crate::metrics;
use crate::sink::KeyframeSink;
use crate::smoothing::smooth_signal;
use crate::source::{check_cancelled, FrameSource, SequentialFrameReader};

/// Upper bound on the signal buffer reserved up front. Reported frame
/// counts come from container headers and are not trusted beyond this.
const SIGNAL_PREALLOC_LIMIT: usize = 1 << 16;

/// Shot detection pipeline.
#[derive(Debug, Clone)]
pub struct ShotPipeline {
    config: ShotDetectionConfig,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl Default for ShotPipeline {
    fn default() -> Self {
        Self::new(ShotDetectionConfig::default())
    }
}

impl ShotPipeline {
    pub fn new(config: ShotDetectionConfig) -> Self {
        Self {
            config,
            cancel_rx: None,
        }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn config(&self) -> &ShotDetectionConfig {
        &self.config
    }

    /// Run shot detection on `source`, handing keyframes to `sink` when
    /// `save_frames` is enabled.
    pub async fn run(
        &self,
        source: &dyn FrameSource,
        sink: Option<&dyn KeyframeSink>,
    ) -> MediaResult<ShotRun> {
        let start = Instant::now();
        let result = self.run_inner(source, sink).await;
        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::record_pipeline_duration(outcome, start.elapsed().as_secs_f64());
        result
    }

    async fn run_inner(
        &self,
        source: &dyn FrameSource,
        sink: Option<&dyn KeyframeSink>,
    ) -> MediaResult<ShotRun> {
        self.config.validate().map_err(MediaError::InvalidConfig)?;
        let cancel = self.cancel_rx.as_ref();
        let source_name = source.name();

        let mut reader = source.open_sequential().await?;
        let metadata = reader.metadata();
        let fps = metadata.fps;
        if !(fps.is_finite() && fps > 0.0) {
            return Err(MediaError::InvalidFps(fps));
        }

        info!(
            source = %source_name,
            fps,
            reported_frames = metadata.frame_count,
            threshold = self.config.threshold,
            min_shot_len_sec = self.config.min_shot_len_sec,
            smooth_k = self.config.smooth_k,
            "Starting shot detection"
        );

        let mut stats = RunStats::default();
        let raw = self.scan(reader.as_mut(), cancel, &mut stats).await?;
        drop(reader);

        let frame_count = raw.len();
        metrics::record_frames_scanned(frame_count);

        let smoothed = smooth_signal(&raw, self.config.smooth_k);
        let signal = SignalReport {
            raw: SignalStats::from_values(&raw),
            smoothed: SignalStats::from_values(&smoothed),
        };
        debug!(
            mean = format!("{:.4}", signal.smoothed.mean),
            p95 = format!("{:.4}", signal.smoothed.p95),
            max = format!("{:.4}", signal.smoothed.max),
            "Smoothed distance signal"
        );

        let boundaries = BoundaryDetector::from_config(&self.config).detect(&smoothed, fps);
        let ranges = shot_ranges(&boundaries);
        info!(
            frames = frame_count,
            boundaries = boundaries.len(),
            candidate_shots = ranges.len(),
            "Boundaries detected"
        );

        let shots = if ranges.is_empty() {
            Vec::new()
        } else {
            let mut seekable = source.open_seekable().await?;
            ShotAssembler::new(
                KeyframeSelector::from_config(&self.config),
                self.config.save_frames,
            )
            .with_cancel(cancel)
            .assemble(&boundaries, fps, seekable.as_mut(), sink, &mut stats)
            .await?
        };

        info!(
            source = %source_name,
            frames = frame_count,
            shots = shots.len(),
            invalid_frames = stats.invalid_frames,
            dropped = stats.empty_shots_dropped + stats.no_keyframe_shots_dropped,
            "Shot detection complete"
        );

        Ok(ShotRun {
            source: source_name,
            fps,
            frame_count,
            threshold_used: self.config.threshold,
            min_shot_len_sec: self.config.min_shot_len_sec,
            smooth_k: self.config.smooth_k,
            shots,
            stats,
            signal,
        })
    }

    /// Forward pass: one distance entry per decoded frame.
    async fn scan(
        &self,
        reader: &mut dyn SequentialFrameReader,
        cancel: Option<&watch::Receiver<bool>>,
        stats: &mut RunStats,
    ) -> MediaResult<Vec<f64>> {
        let limit = self.config.max_frames.unwrap_or(usize::MAX);
        let capacity = reader
            .metadata()
            .frame_count
            .min(limit)
            .min(SIGNAL_PREALLOC_LIMIT);
        let mut builder = DistanceSignalBuilder::with_capacity(capacity);

        while builder.len() < limit {
            check_cancelled(cancel)?;

            let index = builder.len();
            let histogram = match reader.read_next().await {
                Ok(Some(frame)) => HsvHistogram::from_frame(&frame),
                Ok(None) => break,
                Err(e) if !e.is_fatal() => Err(e),
                Err(e) => return Err(e),
            };

            match histogram {
                Ok(histogram) => {
                    builder.push(histogram);
                }
                Err(e) => {
                    warn!(frame = index, error = %e, "Skipping invalid frame");
                    stats.invalid_frames += 1;
                    metrics::record_invalid_frame();
                    builder.push_repeat();
                }
            }
        }

        Ok(builder.finish())
    }
}
