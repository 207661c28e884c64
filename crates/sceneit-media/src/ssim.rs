//! Grayscale conversion and structural similarity.
//!
//! SSIM is computed over 7×7 uniform windows with sample covariance
//! (`N / (N - 1)` normalization), `K1 = 0.01`, `K2 = 0.03` and a data range
//! of 255. The SSIM map is averaged over the pixels whose window lies fully
//! inside the image, i.e. a 3-pixel border is excluded.
//!
//! Window sums come from summed-area tables, so the cost is linear in the
//! pixel count regardless of window size.

use crate::frame::Frame;

/// Side length of the SSIM window.
pub const SSIM_WINDOW: usize = 7;
const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 255.0;

/// An 8-bit single-channel image.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Create an image, returning `None` if the buffer does not match.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (width * height == data.len() && !data.is_empty()).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Whether two images have the same dimensions.
    pub fn same_shape(&self, other: &GrayImage) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// Convert an RGB24 frame to 8-bit luma using BT.601 weights.
///
/// Returns `None` for a malformed frame.
pub fn to_grayscale(frame: &Frame) -> Option<GrayImage> {
    frame.validate().ok()?;
    let data = frame
        .pixels()
        .map(|p| {
            (0.299 * f64::from(p[0]) + 0.587 * f64::from(p[1]) + 0.114 * f64::from(p[2])).round()
                as u8
        })
        .collect();
    GrayImage::new(frame.width as usize, frame.height as usize, data)
}

/// Pixel-wise mean of a set of same-sized images, truncated to 8 bits.
///
/// Returns `None` when the set is empty or the shapes differ.
pub fn mean_image(images: &[GrayImage]) -> Option<GrayImage> {
    let first = images.first()?;
    if !images.iter().all(|img| img.same_shape(first)) {
        return None;
    }

    let mut sum = vec![0u64; first.data.len()];
    for img in images {
        for (acc, &v) in sum.iter_mut().zip(&img.data) {
            *acc += u64::from(v);
        }
    }
    let n = images.len() as u64;
    let data = sum.into_iter().map(|v| (v / n) as u8).collect();
    GrayImage::new(first.width, first.height, data)
}

/// Mean structural similarity between two same-sized images.
///
/// Images smaller than the window in either dimension fall back to a single
/// global window over the whole image. Mismatched shapes score 0.
pub fn structural_similarity(a: &GrayImage, b: &GrayImage) -> f64 {
    if !a.same_shape(b) {
        return 0.0;
    }
    if a.width < SSIM_WINDOW || a.height < SSIM_WINDOW {
        return global_ssim(&a.data, &b.data);
    }

    let w = a.width;
    let h = a.height;
    let (pa, pb) = (&a.data, &b.data);
    let sa = SummedArea::new(w, h, |i| f64::from(pa[i]));
    let sb = SummedArea::new(w, h, |i| f64::from(pb[i]));
    let saa = SummedArea::new(w, h, |i| f64::from(pa[i]) * f64::from(pa[i]));
    let sbb = SummedArea::new(w, h, |i| f64::from(pb[i]) * f64::from(pb[i]));
    let sab = SummedArea::new(w, h, |i| f64::from(pa[i]) * f64::from(pb[i]));

    let np = (SSIM_WINDOW * SSIM_WINDOW) as f64;
    let cov_norm = np / (np - 1.0);
    let (c1, c2) = constants();

    let mut total = 0.0;
    let mut count = 0usize;
    for y in 0..=(h - SSIM_WINDOW) {
        for x in 0..=(w - SSIM_WINDOW) {
            let ux = sa.window(x, y) / np;
            let uy = sb.window(x, y) / np;
            let vx = cov_norm * (saa.window(x, y) / np - ux * ux);
            let vy = cov_norm * (sbb.window(x, y) / np - uy * uy);
            let vxy = cov_norm * (sab.window(x, y) / np - ux * uy);

            total += ssim_term(ux, uy, vx, vy, vxy, c1, c2);
            count += 1;
        }
    }

    total / count as f64
}

fn constants() -> (f64, f64) {
    ((K1 * DATA_RANGE).powi(2), (K2 * DATA_RANGE).powi(2))
}

fn ssim_term(ux: f64, uy: f64, vx: f64, vy: f64, vxy: f64, c1: f64, c2: f64) -> f64 {
    let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
    let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
    numerator / denominator
}

/// SSIM over the whole image as one window.
fn global_ssim(a: &[u8], b: &[u8]) -> f64 {
    let a: Vec<f64> = a.iter().map(|&v| f64::from(v)).collect();
    let b: Vec<f64> = b.iter().map(|&v| f64::from(v)).collect();
    let n = a.len() as f64;
    let ux = a.iter().sum::<f64>() / n;
    let uy = b.iter().sum::<f64>() / n;
    let norm = if n > 1.0 { n - 1.0 } else { 1.0 };

    let vx = a.iter().map(|v| (v - ux).powi(2)).sum::<f64>() / norm;
    let vy = b.iter().map(|v| (v - uy).powi(2)).sum::<f64>() / norm;
    let vxy = a
        .iter()
        .zip(&b)
        .map(|(x, y)| (x - ux) * (y - uy))
        .sum::<f64>()
        / norm;

    let (c1, c2) = constants();
    ssim_term(ux, uy, vx, vy, vxy, c1, c2)
}

/// Summed-area table with a zero row and column in front.
struct SummedArea {
    stride: usize,
    table: Vec<f64>,
}

impl SummedArea {
    fn new(width: usize, height: usize, value: impl Fn(usize) -> f64) -> Self {
        let stride = width + 1;
        let mut table = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += value(y * width + x);
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row;
            }
        }
        Self { stride, table }
    }

    /// Sum of the window whose top-left corner is `(x, y)`.
    fn window(&self, x: usize, y: usize) -> f64 {
        let x1 = x + SSIM_WINDOW;
        let y1 = y + SSIM_WINDOW;
        self.table[y1 * self.stride + x1] - self.table[y * self.stride + x1]
            - self.table[y1 * self.stride + x]
            + self.table[y * self.stride + x]
    }
}
