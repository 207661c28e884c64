//! Moving-average smoothing of the distance signal.
//!
//! The filter is a box kernel of width `k` applied with "same"-length
//! output, aligned like `numpy.convolve(x, ones(k) / k, mode="same")`:
//! output `i` averages inputs `i + (k-1)/2 - (k-1) ..= i + (k-1)/2`.
//!
//! Edge policy: zero padding. Near the ends the missing neighbours count as
//! zeros and the sum is still divided by `k`, so edge values are damped
//! rather than renormalized. A spike in the first or last `k/2` frames is
//! therefore less likely to cross the cut threshold.

/// Smooth `signal` with a moving average of width `k`.
///
/// The output always has the same length as the input. Signals shorter
/// than `k`, and windows of 0 or 1, are returned unchanged.
pub fn smooth_signal(signal: &[f64], k: usize) -> Vec<f64> {
    let n = signal.len();
    if k <= 1 || n < k {
        return signal.to_vec();
    }

    let offset = (k - 1) / 2;
    let scale = 1.0 / k as f64;

    // prefix[i] = sum of signal[..i]
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    let mut running = 0.0;
    for &value in signal {
        running += value;
        prefix.push(running);
    }

    (0..n)
        .map(|i| {
            let hi = (i + offset).min(n - 1);
            let lo = (i + offset).saturating_sub(k - 1);
            (prefix[hi + 1] - prefix[lo]) * scale
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_length_is_preserved() {
        for n in 0..12 {
            let signal: Vec<f64> = (0..n).map(|v| v as f64).collect();
            assert_eq!(smooth_signal(&signal, 5).len(), n);
        }
    }

    #[test]
    fn test_short_signal_is_identity() {
        let signal = vec![1.0, 5.0, 2.0];
        assert_eq!(smooth_signal(&signal, 5), signal);
    }

    #[test]
    fn test_trivial_window_is_identity() {
        let signal = vec![1.0, 5.0, 2.0, 7.0];
        assert_eq!(smooth_signal(&signal, 0), signal);
        assert_eq!(smooth_signal(&signal, 1), signal);
    }

    #[test]
    fn test_odd_window_matches_same_convolution() {
        // numpy.convolve([0,0,5,0,0,0], ones(3)/3, "same")
        let smoothed = smooth_signal(&[0.0, 0.0, 5.0, 0.0, 0.0, 0.0], 3);
        let third = 5.0 / 3.0;
        assert_close(&smoothed, &[0.0, third, third, third, 0.0, 0.0]);
    }

    #[test]
    fn test_edges_are_zero_padded() {
        // numpy.convolve([3,3,3,3,3], ones(3)/3, "same") = [2,3,3,3,2]
        let smoothed = smooth_signal(&[3.0; 5], 3);
        assert_close(&smoothed, &[2.0, 3.0, 3.0, 3.0, 2.0]);
    }

    #[test]
    fn test_even_window_alignment() {
        // numpy.convolve([0,0,4,0,0], ones(4)/4, "same") = [0,1,1,1,1]
        let smoothed = smooth_signal(&[0.0, 0.0, 4.0, 0.0, 0.0], 4);
        assert_close(&smoothed, &[0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_spike_spreads_over_window() {
        let mut signal = vec![0.0; 20];
        signal[10] = 10.0;
        let smoothed = smooth_signal(&signal, 5);
        for (i, value) in smoothed.iter().enumerate() {
            if (8..=12).contains(&i) {
                assert!((value - 2.0).abs() < 1e-9);
            } else {
                assert!(value.abs() < 1e-9);
            }
        }
    }
}
