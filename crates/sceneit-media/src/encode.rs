//! Keyframe image encoding.

use image::codecs::jpeg::JpegEncoder;
use image::ColorType;

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Default JPEG quality for keyframe artifacts.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Encode a frame as JPEG. Quality is clamped to 1..=100.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> MediaResult<Vec<u8>> {
    frame
        .validate()
        .map_err(|e| MediaError::Encode(e.to_string()))?;

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder
        .encode(&frame.data, frame.width, frame.height, ColorType::Rgb8)
        .map_err(|e| MediaError::Encode(format!("frame {}: {}", frame.index, e)))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_jpeg_decodes_back() {
        let frame = Frame::filled(3, 32, 16, [200, 30, 30]);
        let bytes = encode_jpeg(&frame, DEFAULT_JPEG_QUALITY).unwrap();

        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded =
            image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 16);
    }

    #[test]
    fn test_encode_rejects_malformed_frame() {
        let frame = Frame::new(1, 4, 4, vec![0u8; 7]);
        assert!(matches!(encode_jpeg(&frame, 90), Err(MediaError::Encode(_))));
    }
}
