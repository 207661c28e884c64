//! Keyframe selection inside a shot.
//!
//! Samples frames from the shot at a fixed stride, builds the pixel-wise
//! mean of the grayscale samples and picks the sample that is structurally
//! most similar to that mean. The mean acts as a "typical look" of the shot,
//! so the winner is the least transitional, least blurred candidate.
//!
//! Only the 8-bit grayscale of each sample is kept while scoring. The
//! winning frame is read again by whoever needs its pixels.

use rayon::prelude::*;
use sceneit_models::ShotDetectionConfig;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::source::{check_cancelled, SeekableFrameReader};
use crate::ssim::{mean_image, structural_similarity, to_grayscale, GrayImage};

/// The chosen keyframe of one shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeChoice {
    /// Frame index of the keyframe
    pub index: usize,
    /// SSIM against the shot's mean image
    pub score: f64,
    /// Readable samples that took part in the selection
    pub candidates: usize,
}

/// Picks one representative frame per shot.
#[derive(Debug, Clone)]
pub struct KeyframeSelector {
    samples_per_second: u32,
    samples_per_shot: Option<usize>,
}

impl Default for KeyframeSelector {
    fn default() -> Self {
        Self::from_config(&ShotDetectionConfig::default())
    }
}

impl KeyframeSelector {
    pub fn new(samples_per_second: u32, samples_per_shot: Option<usize>) -> Self {
        Self {
            samples_per_second: samples_per_second.max(1),
            samples_per_shot: samples_per_shot.filter(|&n| n > 0),
        }
    }

    pub fn from_config(config: &ShotDetectionConfig) -> Self {
        Self::new(config.samples_per_second, config.samples_per_shot)
    }

    /// Sampling stride in frames for a shot of `shot_len` frames.
    ///
    /// `floor(fps / samples_per_second)`, at least 1. When a per-shot cap is
    /// set, the stride widens so no more than the cap is sampled.
    pub fn stride(&self, fps: f64, shot_len: usize) -> usize {
        let base = (fps / self.samples_per_second as f64).floor();
        let mut stride = if base.is_finite() && base >= 1.0 {
            base as usize
        } else {
            1
        };
        if let Some(cap) = self.samples_per_shot {
            if shot_len.div_ceil(stride) > cap {
                stride = shot_len.div_ceil(cap);
            }
        }
        stride
    }

    /// Candidate indices `start, start + stride, ...` below `end`.
    pub fn sample_indices(&self, start: usize, end: usize, fps: f64) -> Vec<usize> {
        if end <= start {
            return Vec::new();
        }
        let stride = self.stride(fps, end - start);
        (start..end).step_by(stride).collect()
    }

    /// Select the keyframe of the shot `[start, end)`.
    ///
    /// Unreadable samples are skipped. Fails with [`MediaError::EmptyShot`]
    /// when the range is empty and [`MediaError::NoKeyframe`] when no sample
    /// could be read.
    pub async fn select(
        &self,
        reader: &mut dyn SeekableFrameReader,
        start: usize,
        end: usize,
        fps: f64,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<KeyframeChoice> {
        if end <= start {
            return Err(MediaError::EmptyShot {
                start_frame: start,
                end_frame: end,
            });
        }

        let indices = self.sample_indices(start, end, fps);
        let mut sampled: Vec<usize> = Vec::with_capacity(indices.len());
        let mut grays: Vec<GrayImage> = Vec::with_capacity(indices.len());

        for index in indices {
            check_cancelled(cancel)?;

            let frame = match reader.seek_and_read(index).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!(frame = index, "Keyframe candidate unreadable");
                    continue;
                }
                Err(e) if !e.is_fatal() => {
                    debug!(frame = index, error = %e, "Keyframe candidate skipped");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let Some(gray) = to_grayscale(&frame) else {
                debug!(frame = index, "Keyframe candidate has a malformed buffer");
                continue;
            };

            if let Some(first) = grays.first() {
                if !first.same_shape(&gray) {
                    warn!(
                        frame = index,
                        "Keyframe candidate size differs from the first sample, skipping"
                    );
                    continue;
                }
            }
            sampled.push(index);
            grays.push(gray);
        }

        let no_keyframe = || MediaError::NoKeyframe {
            start_frame: start,
            end_frame: end,
        };

        let mean = mean_image(&grays).ok_or_else(no_keyframe)?;

        let scores: Vec<f64> = grays
            .par_iter()
            .map(|g| structural_similarity(g, &mean))
            .collect();

        let best = stable_argmax(&scores).ok_or_else(no_keyframe)?;

        Ok(KeyframeChoice {
            index: sampled[best],
            score: scores[best],
            candidates: grays.len(),
        })
    }
}

/// Index of the largest score; the earliest wins ties. NaN never wins.
fn stable_argmax(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if score <= b => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}
