//! Inter-frame distance signal.
//!
//! The distance between two normalized histograms is derived from the
//! Bhattacharyya coefficient `BC = Σ sqrt(h1_i * h2_i)`:
//!
//! ```text
//! d = -ln(BC)
//! ```
//!
//! `d` is 0 for identical distributions and grows as they diverge. The
//! coefficient is floored at [`BHATTACHARYYA_FLOOR`] so disjoint histograms
//! produce a large finite distance instead of infinity.

use crate::histogram::HsvHistogram;

/// Smallest coefficient fed to the logarithm.
pub const BHATTACHARYYA_FLOOR: f64 = 1e-6;

/// Largest distance the signal can contain (`-ln(BHATTACHARYYA_FLOOR)`).
pub fn max_distance() -> f64 {
    -BHATTACHARYYA_FLOOR.ln()
}

/// Bhattacharyya coefficient between two histograms, in [0, 1].
pub fn bhattacharyya_coefficient(h1: &HsvHistogram, h2: &HsvHistogram) -> f64 {
    h1.bins()
        .iter()
        .zip(h2.bins())
        .map(|(a, b)| (a * b).sqrt())
        .sum()
}

/// Bhattacharyya distance between two histograms, clamped to
/// `[0, max_distance()]`.
pub fn bhattacharyya_distance(h1: &HsvHistogram, h2: &HsvHistogram) -> f64 {
    let bc = bhattacharyya_coefficient(h1, h2);
    if !bc.is_finite() {
        return max_distance();
    }
    // Rounding can push BC for identical histograms slightly above 1.
    (-bc.max(BHATTACHARYYA_FLOOR).ln()).clamp(0.0, max_distance())
}

/// Build the distance signal for an ordered histogram sequence.
///
/// The result has exactly one entry per histogram and entry 0 is 0.
pub fn distance_signal(histograms: &[HsvHistogram]) -> Vec<f64> {
    let mut builder = DistanceSignalBuilder::with_capacity(histograms.len());
    for histogram in histograms {
        builder.push(histogram.clone());
    }
    builder.finish()
}

/// Streaming distance signal builder.
///
/// Keeps only the previous histogram, so the forward pass holds one
/// histogram and the growing signal regardless of video length.
#[derive(Debug, Default)]
pub struct DistanceSignalBuilder {
    previous: Option<HsvHistogram>,
    signal: Vec<f64>,
}

impl DistanceSignalBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty builder with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            previous: None,
            signal: Vec::with_capacity(capacity),
        }
    }

    /// Append the next frame's histogram and return its distance entry.
    pub fn push(&mut self, histogram: HsvHistogram) -> f64 {
        let distance = match &self.previous {
            Some(previous) => bhattacharyya_distance(previous, &histogram),
            None => 0.0,
        };
        self.previous = Some(histogram);
        self.signal.push(distance);
        distance
    }

    /// Append an entry for a frame that could not be analysed.
    ///
    /// The frame is treated as identical to its predecessor (distance 0) and
    /// the previous histogram stays in place, so indices stay aligned with
    /// the decoded stream.
    pub fn push_repeat(&mut self) {
        self.signal.push(0.0);
    }

    /// Number of entries so far.
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    /// Whether no entries were pushed yet.
    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    /// Finish and return the signal.
    pub fn finish(self) -> Vec<f64> {
        self.signal
    }
}
