//! Circular face crop and JPEG encoding for the verification upload.
//!
//! The crop matches the circular guide drawn over the live preview: a square
//! centred on the frame whose side is a fraction of the shorter frame edge,
//! with everything outside the inscribed circle blacked out.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use thiserror::Error;

/// Fraction of the shorter frame edge covered by the crop.
pub const DEFAULT_CROP_RATIO: f32 = 0.65;

/// JPEG quality used for uploads (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("video frame is empty ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("crop ratio must be in (0, 1], got {0}")]
    InvalidRatio(f32),
    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Crop a centred circle out of `frame`.
pub fn circular_crop(frame: &RgbImage, ratio: f32) -> Result<RgbImage, CaptureError> {
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(CaptureError::InvalidRatio(ratio));
    }

    let (width, height) = frame.dimensions();
    let side = (width.min(height) as f32 * ratio).floor() as u32;
    if side == 0 {
        return Err(CaptureError::EmptyFrame { width, height });
    }

    let left = (width - side) / 2;
    let top = (height - side) / 2;
    let radius = side as f32 / 2.0;
    let radius_sq = radius * radius;

    let cropped = RgbImage::from_fn(side, side, |x, y| {
        // Sample at pixel centres so the mask is symmetric.
        let dx = x as f32 + 0.5 - radius;
        let dy = y as f32 + 0.5 - radius;
        if dx * dx + dy * dy <= radius_sq {
            *frame.get_pixel(left + x, top + y)
        } else {
            Rgb([0, 0, 0])
        }
    });

    Ok(cropped)
}

/// Encode an RGB image as JPEG at the given quality.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    image.write_with_encoder(encoder)?;
    Ok(buf.into_inner())
}

/// Crop the face circle out of `frame` and encode it for upload.
pub fn capture_face_jpeg(
    frame: &RgbImage,
    ratio: f32,
    quality: u8,
) -> Result<Vec<u8>, CaptureError> {
    let cropped = circular_crop(frame, ratio)?;
    encode_jpeg(&cropped, quality)
}
