//! JPEG frame decoder.
//!
//! Turns the encoded stills sent by the payload camera into
//! [`Bitmap`]s a panel can display.

use image::ImageFormat;

use crate::bitmap::Bitmap;
use crate::error::SkyframeError;

/// JPEG start-of-image marker.
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Decode a JPEG buffer into a BGRA bitmap.
///
/// Any failure to interpret `data` as a JPEG image is reported as
/// [`SkyframeError::InvalidImage`].
pub fn decode_jpeg(data: &[u8]) -> Result<Bitmap, SkyframeError> {
    if data.is_empty() {
        return Err(SkyframeError::InvalidImage("empty buffer".into()));
    }
    if !data.starts_with(&JPEG_SOI) {
        return Err(SkyframeError::InvalidImage(
            "missing JPEG start-of-image marker".into(),
        ));
    }

    let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| SkyframeError::InvalidImage(e.to_string()))?;

    Bitmap::from_rgba_image(&img.to_rgba8())
}

// ── Tests ────────────────────────────────────────────────────────
