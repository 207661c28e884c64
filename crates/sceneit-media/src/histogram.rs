//! HSV color histograms.
//!
//! Each frame is reduced to a joint hue/saturation/value histogram with
//! 16 × 8 × 8 = 1024 bins. The histogram is L1-normalized so it behaves like
//! a probability distribution and does not depend on frame resolution.
//!
//! Quantization follows the 8-bit HSV convention: hue covers [0, 360)
//! degrees, saturation and value are scaled to [0, 255] before binning.

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Hue bins.
pub const HUE_BINS: usize = 16;
/// Saturation bins.
pub const SATURATION_BINS: usize = 8;
/// Value bins.
pub const VALUE_BINS: usize = 8;
/// Total histogram length.
pub const HISTOGRAM_BINS: usize = HUE_BINS * SATURATION_BINS * VALUE_BINS;

/// Normalized HSV histogram of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HsvHistogram {
    bins: Vec<f64>,
}

impl HsvHistogram {
    /// Compute the histogram of a frame.
    ///
    /// Fails with [`MediaError::InvalidFrame`] when the buffer is empty or
    /// does not match the frame dimensions.
    pub fn from_frame(frame: &Frame) -> MediaResult<Self> {
        frame.validate()?;

        let mut counts = vec![0u32; HISTOGRAM_BINS];
        for pixel in frame.pixels() {
            counts[bin_index(pixel[0], pixel[1], pixel[2])] += 1;
        }

        let total = frame.pixel_count() as f64;
        if total == 0.0 {
            return Err(MediaError::invalid_frame(frame.index, "no pixels"));
        }

        let bins = counts.into_iter().map(|c| c as f64 / total).collect();
        Ok(Self { bins })
    }

    /// Build a histogram from raw bin weights, normalizing them to sum to 1.
    ///
    /// Returns `None` when the length is wrong or the weights sum to zero.
    pub fn from_weights(weights: Vec<f64>) -> Option<Self> {
        if weights.len() != HISTOGRAM_BINS {
            return None;
        }
        let total: f64 = weights.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return None;
        }
        Some(Self {
            bins: weights.into_iter().map(|w| w / total).collect(),
        })
    }

    /// Normalized bin values.
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }
}

/// Flattened bin index for an RGB pixel.
fn bin_index(r: u8, g: u8, b: u8) -> usize {
    let (h, s, v) = rgb_to_hsv8(r, g, b);

    let h_bin = ((h / 360.0) * HUE_BINS as f64).min(HUE_BINS as f64 - 1.0) as usize;
    let s_bin = (s as usize * SATURATION_BINS) / 256;
    let v_bin = (v as usize * VALUE_BINS) / 256;

    h_bin * SATURATION_BINS * VALUE_BINS + s_bin * VALUE_BINS + v_bin
}

/// Hue in degrees plus 8-bit saturation and value, the same quantities an
/// 8-bit HSV conversion produces before its hue is halved.
fn rgb_to_hsv8(r: u8, g: u8, b: u8) -> (f64, u8, u8) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = u32::from(max - min);
    if chroma == 0 {
        return (0.0, 0, max);
    }

    let saturation = ((255 * chroma + u32::from(max) / 2) / u32::from(max)) as u8;

    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    let c = chroma as f64;
    let top = f64::from(max);
    let sector = if top == r {
        (g - b) / c
    } else if top == g {
        (b - r) / c + 2.0
    } else {
        (r - g) / c + 4.0
    };

    ((60.0 * sector).rem_euclid(360.0), saturation, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_is_normalized() {
        let mut data = Vec::new();
        for i in 0..64u32 {
            data.extend_from_slice(&[(i * 4) as u8, (255 - i * 3) as u8, (i * 2) as u8]);
        }
        let frame = Frame::new(0, 8, 8, data);
        let hist = HsvHistogram::from_frame(&frame).unwrap();

        assert_eq!(hist.bins().len(), HISTOGRAM_BINS);
        let total: f64 = hist.bins().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(hist.bins().iter().all(|&b| b >= 0.0));
    }

    #[test]
    fn test_histogram_is_resolution_invariant() {
        let small = HsvHistogram::from_frame(&Frame::filled(0, 4, 4, [200, 40, 40])).unwrap();
        let large = HsvHistogram::from_frame(&Frame::filled(0, 64, 36, [200, 40, 40])).unwrap();
        assert_eq!(small, large);
    }

    #[test]
    fn test_solid_colors_use_distinct_bins() {
        let red = HsvHistogram::from_frame(&Frame::filled(0, 4, 4, [255, 0, 0])).unwrap();
        let blue = HsvHistogram::from_frame(&Frame::filled(0, 4, 4, [0, 0, 255])).unwrap();

        let red_bin = red.bins().iter().position(|&b| b > 0.0).unwrap();
        let blue_bin = blue.bins().iter().position(|&b| b > 0.0).unwrap();
        assert_ne!(red_bin, blue_bin);
        assert!((red.bins()[red_bin] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pure_red_bin() {
        // hue 0, saturation 255, value 255
        assert_eq!(bin_index(255, 0, 0), 7 * VALUE_BINS + 7);
        // black lands in the very first bin
        assert_eq!(bin_index(0, 0, 0), 0);
    }

    #[test]
    fn test_invalid_frame_is_rejected() {
        let frame = Frame::new(9, 4, 4, vec![0u8; 5]);
        assert!(matches!(
            HsvHistogram::from_frame(&frame),
            Err(MediaError::InvalidFrame { index: 9, .. })
        ));
    }

    #[test]
    fn test_from_weights() {
        assert!(HsvHistogram::from_weights(vec![1.0; 3]).is_none());
        assert!(HsvHistogram::from_weights(vec![0.0; HISTOGRAM_BINS]).is_none());

        let hist = HsvHistogram::from_weights(vec![2.0; HISTOGRAM_BINS]).unwrap();
        assert!((hist.bins()[0] - 1.0 / HISTOGRAM_BINS as f64).abs() < 1e-12);
    }

    #[test]
    fn test_hsv8_hues() {
        assert_eq!(rgb_to_hsv8(255, 0, 0), (0.0, 255, 255));
        assert!((rgb_to_hsv8(0, 255, 0).0 - 120.0).abs() < 1e-9);
        assert!((rgb_to_hsv8(0, 0, 255).0 - 240.0).abs() < 1e-9);
        // red above blue wraps below 360 instead of going negative
        let (h, _, _) = rgb_to_hsv8(255, 0, 128);
        assert!((h - 329.88).abs() < 0.01, "hue {}", h);
    }

    #[test]
    fn test_hsv8_saturation_rounds() {
        assert_eq!(rgb_to_hsv8(200, 100, 100), (0.0, 128, 200));
        assert_eq!(rgb_to_hsv8(128, 128, 128), (0.0, 0, 128));
        assert_eq!(rgb_to_hsv8(0, 0, 0), (0.0, 0, 0));
    }
}
